//! Local-first client library for the expense tracker.
//!
//! The pieces compose the way the data flows: a UI action goes through
//! the [`sync::ExpenseTracker`], which mutates the [`cache::LocalCache`]
//! synchronously and reconciles with the remote record store in the
//! background; the [`analytics`] module then folds the cached expense
//! list into the derived views a dashboard renders.

pub mod analytics;
pub mod auth;
pub mod cache;
pub mod error;
pub mod export;
pub mod remote;
pub mod sync;

pub use auth::{FixedIdentity, Identity, IdentityProvider};
pub use cache::LocalCache;
pub use error::SyncError;
pub use export::CsvReport;
pub use remote::{HttpRecordStore, RemoteConfig, RemoteStore, DEFAULT_REMOTE_TIMEOUT_SECS};
pub use sync::{spawn_detached, ExpenseTracker, NewExpense};
