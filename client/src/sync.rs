//! The sync layer: local-first CRUD with background reconciliation.
//!
//! Every operation resolves the caller's identity, applies its effect to
//! the local cache synchronously, and lets the remote store catch up off
//! the caller's path. The cache is authoritative for the UI; the remote
//! store is a best-effort mirror. Reads are cache-first with a
//! fire-and-forget refresh; a cold read falls back to a synchronous
//! remote fetch and, failing that, an empty result.
//!
//! Concurrency model: nothing here blocks on the network while holding
//! cache state, and a stale refresh response arriving after newer local
//! state simply overwrites the cache (last-response-wins; there is no
//! conflict detection).

use chrono::{NaiveDate, Utc};
use shared::{Category, Expense, UpdateExpenseRequest, UpdateUserRequest, User, ValidationError};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{Identity, IdentityProvider};
use crate::cache::LocalCache;
use crate::error::SyncError;
use crate::export::{build_csv_report, CsvReport};
use crate::remote::RemoteStore;

/// Run a reconciliation future off the caller's path.
///
/// The result is discarded; a failure lands in the log and nowhere else.
/// This is the only boundary through which background remote errors are
/// allowed to disappear.
pub fn spawn_detached<F>(label: &'static str, future: F)
where
    F: Future<Output = Result<(), SyncError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = future.await {
            warn!("Background sync failed ({}): {}", label, e);
        }
    });
}

/// Input for creating an expense; owner and id are filled in by the
/// tracker.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount: f64,
    pub category: Category,
    pub date: NaiveDate,
    pub description: Option<String>,
}

/// Local-first expense tracking over an injectable cache, identity
/// provider and remote store.
pub struct ExpenseTracker<I, R> {
    identity: Arc<I>,
    cache: Arc<LocalCache>,
    remote: Arc<R>,
}

impl<I, R> ExpenseTracker<I, R>
where
    I: IdentityProvider + 'static,
    R: RemoteStore + 'static,
{
    pub fn new(identity: Arc<I>, cache: Arc<LocalCache>, remote: Arc<R>) -> Self {
        Self {
            identity,
            cache,
            remote,
        }
    }

    /// The cache this tracker mirrors into; exposed so embedders can run
    /// the logout lifecycle (`clear_user`).
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    fn require_identity(&self) -> Result<Identity, SyncError> {
        self.identity
            .current_identity()
            .ok_or(SyncError::Unauthenticated)
    }

    /// Idempotent create-user: returns the record for the current
    /// identity, creating it when absent. A second call yields the same
    /// stored record; a remote "already exists" never surfaces.
    pub async fn ensure_user(&self, email: &str) -> Result<User, SyncError> {
        let identity = self.require_identity()?;

        if let Some(user) = self.cache.get_user(&identity.user_id) {
            return Ok(user);
        }

        // Cold cache: the record may already live remotely.
        match self.remote.get_user(&identity.user_id).await {
            Ok(Some(user)) => {
                self.cache.put_user(user.clone());
                return Ok(user);
            }
            Ok(None) => {}
            Err(e) => warn!("ensure_user: remote lookup failed, creating locally: {}", e),
        }

        let user = User {
            user_id: identity.user_id.clone(),
            email: email.to_string(),
            monthly_budget: 0.0,
            created_at: Utc::now().to_rfc3339(),
        };
        self.cache.put_user(user.clone());

        let remote = Arc::clone(&self.remote);
        let payload = user.clone();
        spawn_detached("create-user", async move {
            remote.create_user(&payload).await
        });

        Ok(user)
    }

    /// Cache-first read of the current user's record. Returns None only
    /// after both tiers come up empty; never errors for "no data".
    pub async fn user_details(&self) -> Result<Option<User>, SyncError> {
        let identity = self.require_identity()?;

        if let Some(user) = self.cache.get_user(&identity.user_id) {
            let remote = Arc::clone(&self.remote);
            let cache = Arc::clone(&self.cache);
            let user_id = identity.user_id.clone();
            spawn_detached("refresh-user", async move {
                if let Some(fresh) = remote.get_user(&user_id).await? {
                    cache.put_user(fresh);
                }
                Ok(())
            });
            return Ok(Some(user));
        }

        match self.remote.get_user(&identity.user_id).await {
            Ok(Some(user)) => {
                self.cache.put_user(user.clone());
                Ok(Some(user))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("user_details: remote fetch failed: {}", e);
                Ok(None)
            }
        }
    }

    /// Set the monthly budget. The local record is written and returned
    /// immediately; the remote update runs detached.
    pub async fn set_monthly_budget(&self, monthly_budget: f64) -> Result<User, SyncError> {
        let identity = self.require_identity()?;

        if monthly_budget < 0.0 {
            return Err(ValidationError::NegativeBudget.into());
        }

        let user = match self.cache.get_user(&identity.user_id) {
            Some(mut user) => {
                user.monthly_budget = monthly_budget;
                user
            }
            None => User {
                user_id: identity.user_id.clone(),
                email: identity
                    .email
                    .clone()
                    .unwrap_or_else(|| format!("{}@example.com", identity.user_id)),
                monthly_budget,
                created_at: Utc::now().to_rfc3339(),
            },
        };
        self.cache.put_user(user.clone());

        let remote = Arc::clone(&self.remote);
        let user_id = identity.user_id.clone();
        let request = UpdateUserRequest {
            monthly_budget: Some(monthly_budget),
        };
        spawn_detached("sync-budget", async move {
            remote.update_user(&user_id, &request).await.map(|_| ())
        });

        Ok(user)
    }

    /// Record an expense. Visible to `expenses()` immediately, mirrored
    /// to the remote store in the background.
    pub async fn add_expense(&self, new_expense: NewExpense) -> Result<Expense, SyncError> {
        let identity = self.require_identity()?;

        if new_expense.amount <= 0.0 {
            return Err(ValidationError::AmountNotPositive.into());
        }

        let expense = Expense {
            expense_id: Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            amount: new_expense.amount,
            category: new_expense.category,
            date: new_expense.date,
            description: new_expense.description,
        };
        self.cache.push_expense(expense.clone());

        let remote = Arc::clone(&self.remote);
        let payload = expense.clone();
        spawn_detached("sync-expense", async move {
            remote.create_expense(&payload).await
        });

        Ok(expense)
    }

    /// Update an owned expense. Ownership is checked against the cached
    /// record before anything is written.
    pub async fn update_expense(
        &self,
        expense_id: &str,
        patch: UpdateExpenseRequest,
    ) -> Result<Expense, SyncError> {
        let identity = self.require_identity()?;
        patch.validate()?;

        let expenses = self.expenses().await?;
        let mut expense = expenses
            .into_iter()
            .find(|e| e.expense_id == expense_id)
            .ok_or(SyncError::NotFound)?;

        if expense.user_id != identity.user_id {
            return Err(SyncError::Ownership);
        }

        patch.apply_to(&mut expense)?;
        self.cache.update_expense(&expense);

        let remote = Arc::clone(&self.remote);
        let id = expense_id.to_string();
        let request = UpdateExpenseRequest {
            user_id: Some(identity.user_id),
            ..patch
        };
        spawn_detached("sync-update", async move {
            remote.update_expense(&id, &request).await
        });

        Ok(expense)
    }

    /// Delete an expense. The cached list drops it immediately, so it is
    /// gone from subsequent reads whether or not the remote delete has
    /// completed (or ever does).
    pub async fn delete_expense(&self, expense_id: &str) -> Result<(), SyncError> {
        let identity = self.require_identity()?;

        self.cache.remove_expense(&identity.user_id, expense_id);

        let remote = Arc::clone(&self.remote);
        let id = expense_id.to_string();
        spawn_detached("sync-delete", async move {
            remote.delete_expense(&id).await
        });

        Ok(())
    }

    /// Cache-first expense list. A warm cache answers instantly and
    /// refreshes in the background; a cold cache fetches synchronously;
    /// total failure degrades to an empty list, never an error.
    pub async fn expenses(&self) -> Result<Vec<Expense>, SyncError> {
        let identity = self.require_identity()?;

        if let Some(expenses) = self.cache.get_expenses(&identity.user_id) {
            let remote = Arc::clone(&self.remote);
            let cache = Arc::clone(&self.cache);
            let user_id = identity.user_id.clone();
            spawn_detached("refresh-expenses", async move {
                let fresh = remote.list_expenses(&user_id).await?;
                // Last-response-wins: this may clobber a local write that
                // has not reached the remote yet.
                cache.put_expenses(&user_id, fresh);
                Ok(())
            });
            return Ok(expenses);
        }

        match self.remote.list_expenses(&identity.user_id).await {
            Ok(expenses) => {
                self.cache.put_expenses(&identity.user_id, expenses.clone());
                Ok(expenses)
            }
            Err(e) => {
                warn!("expenses: remote fetch failed: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Build the CSV report from cached expenses and nudge the remote
    /// store to generate its copy. Errors with NotFound when there is
    /// nothing to export.
    pub async fn export_report(&self) -> Result<CsvReport, SyncError> {
        let identity = self.require_identity()?;

        let expenses = self.cache.get_expenses(&identity.user_id).unwrap_or_default();
        if expenses.is_empty() {
            return Err(SyncError::NotFound);
        }

        let report = build_csv_report(
            &identity.user_id,
            &expenses,
            chrono::Local::now().date_naive(),
        );

        let remote = Arc::clone(&self.remote);
        let user_id = identity.user_id.clone();
        spawn_detached("remote-report", async move {
            remote.generate_report(&user_id).await.map(|_| ())
        });

        Ok(report)
    }
}
