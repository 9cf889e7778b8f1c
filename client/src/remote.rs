//! Remote record-store access.
//!
//! The sync layer talks to the store through the `RemoteStore` trait so
//! the HTTP client and the in-memory test double are interchangeable.

use async_trait::async_trait;
use reqwest::StatusCode;
use shared::{ErrorBody, Expense, ReportResponse, UpdateExpenseRequest, UpdateUserRequest, User};
use std::time::Duration;
use tracing::debug;

use crate::error::SyncError;

/// Bounded timeout for every remote call, so a dead backend cannot hang a
/// background reconciliation task indefinitely.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the record-store API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }
}

/// Operations the sync layer needs from the record store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SyncError>;

    /// Idempotent from the caller's point of view: a store that reports
    /// "already exists" is treated as success.
    async fn create_user(&self, user: &User) -> Result<(), SyncError>;

    async fn update_user(
        &self,
        user_id: &str,
        request: &UpdateUserRequest,
    ) -> Result<User, SyncError>;

    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, SyncError>;

    async fn create_expense(&self, expense: &Expense) -> Result<(), SyncError>;

    async fn update_expense(
        &self,
        expense_id: &str,
        request: &UpdateExpenseRequest,
    ) -> Result<(), SyncError>;

    async fn delete_expense(&self, expense_id: &str) -> Result<(), SyncError>;

    /// Ask the store to build a report; returns the download URL.
    async fn generate_report(&self, user_id: &str) -> Result<String, SyncError>;
}

/// reqwest-backed implementation of `RemoteStore`.
#[derive(Clone)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecordStore {
    pub fn new(config: RemoteConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport_error(e: reqwest::Error) -> SyncError {
    SyncError::RemoteUnavailable(e.to_string())
}

/// Map a non-success response to the error taxonomy, pulling the server's
/// `message` out of the body when there is one.
async fn error_from_response(response: reqwest::Response) -> SyncError {
    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => SyncError::NotFound,
        StatusCode::FORBIDDEN => SyncError::Ownership,
        _ => {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            SyncError::RemoteUnavailable(message)
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRecordStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SyncError> {
        let response = self
            .client
            .get(self.url(&format!("/users/{}", user_id)))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json().await.map(Some).map_err(transport_error)
    }

    async fn create_user(&self, user: &User) -> Result<(), SyncError> {
        let response = self
            .client
            .post(self.url("/users"))
            .json(user)
            .send()
            .await
            .map_err(transport_error)?;

        // 409 means the record is already there, which is exactly the
        // state this call exists to reach.
        if response.status() == StatusCode::CONFLICT {
            debug!("create_user: {} already exists remotely", user.user_id);
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn update_user(
        &self,
        user_id: &str,
        request: &UpdateUserRequest,
    ) -> Result<User, SyncError> {
        let response = self
            .client
            .put(self.url(&format!("/users/{}", user_id)))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json().await.map_err(transport_error)
    }

    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, SyncError> {
        let response = self
            .client
            .get(self.url(&format!("/expenses/user/{}", user_id)))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json().await.map_err(transport_error)
    }

    async fn create_expense(&self, expense: &Expense) -> Result<(), SyncError> {
        let response = self
            .client
            .post(self.url("/expenses"))
            .json(expense)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn update_expense(
        &self,
        expense_id: &str,
        request: &UpdateExpenseRequest,
    ) -> Result<(), SyncError> {
        let response = self
            .client
            .put(self.url(&format!("/expenses/{}", expense_id)))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), SyncError> {
        let response = self
            .client
            .delete(self.url(&format!("/expenses/{}", expense_id)))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn generate_report(&self, user_id: &str) -> Result<String, SyncError> {
        let response = self
            .client
            .get(self.url(&format!("/reports/{}", user_id)))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<ReportResponse>()
            .await
            .map(|body| body.url)
            .map_err(transport_error)
    }
}
