//! CSV report generation for the record store.
//!
//! `GET /reports/{userId}` renders the owner's expenses to CSV, stores the
//! file under the report directory, and hands back a download URL that is
//! only honored for a bounded time - the stand-in for a presigned object
//! URL.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use shared::Expense;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::db::DbConnection;

/// How long a generated download URL stays valid.
pub const REPORT_URL_TTL_SECS: i64 = 3600;

struct StoredReport {
    path: PathBuf,
    filename: String,
    expires_at: DateTime<Utc>,
}

/// Stores generated CSV reports and resolves download tokens.
///
/// Tokens live in memory; a restart invalidates outstanding URLs, which is
/// within the "time-limited" contract.
#[derive(Clone)]
pub struct ReportService {
    dir: PathBuf,
    tokens: Arc<RwLock<HashMap<String, StoredReport>>>,
}

impl ReportService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build and store a report for the user. Returns the download URL
    /// path, or None when the user has no expenses at all.
    pub async fn generate(&self, db: &DbConnection, user_id: &str) -> Result<Option<String>> {
        let expenses = db.list_expenses_by_user(user_id).await?;
        if expenses.is_empty() {
            return Ok(None);
        }

        let csv_content = render_csv(&expenses);
        let filename = format!(
            "expense-report-{}-{}.csv",
            user_id,
            Utc::now().format("%Y-%m-%dT%H-%M-%SZ")
        );

        fs::create_dir_all(&self.dir)?;
        let token = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("{}.csv", token));
        fs::write(&path, &csv_content)?;

        let expires_at = Utc::now() + Duration::seconds(REPORT_URL_TTL_SECS);
        self.tokens.write().expect("report token lock poisoned").insert(
            token.clone(),
            StoredReport {
                path,
                filename,
                expires_at,
            },
        );

        info!(
            "Generated report for {}: {} expenses, {} bytes",
            user_id,
            expenses.len(),
            csv_content.len()
        );

        Ok(Some(format!("/reports/download/{}", token)))
    }

    /// Resolve a download token to `(filename, csv content)`.
    ///
    /// Expired or unknown tokens resolve to None; expired entries are
    /// dropped on the way out.
    pub fn open(&self, token: &str) -> Option<(String, String)> {
        let mut tokens = self.tokens.write().expect("report token lock poisoned");
        let now = Utc::now();

        if tokens.get(token).is_some_and(|r| r.expires_at <= now) {
            let stale = tokens.remove(token).expect("entry checked above");
            let _ = fs::remove_file(&stale.path);
            return None;
        }

        let report = tokens.get(token)?;
        let content = fs::read_to_string(&report.path).ok()?;
        Some((report.filename.clone(), content))
    }

    /// Force a token to the expired state. Test hook only.
    #[cfg(test)]
    fn expire_token(&self, token: &str) {
        if let Some(report) = self.tokens.write().unwrap().get_mut(token) {
            report.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

/// Server-side CSV body: raw ISO dates, unquoted descriptions.
fn render_csv(expenses: &[Expense]) -> String {
    let mut csv_content = String::from("Date,Amount,Category,Description\n");
    for expense in expenses {
        csv_content.push_str(&format!(
            "{},{},{},{}\n",
            expense.date,
            expense.amount,
            expense.category,
            expense.description.as_deref().unwrap_or("")
        ));
    }
    csv_content
}
