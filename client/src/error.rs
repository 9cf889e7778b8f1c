use shared::ValidationError;

/// Failure taxonomy for sync-layer operations.
///
/// Validation and ownership failures surface to the UI; remote failures
/// only reach the caller on synchronous paths with no local fallback.
/// Background reconciliation failures never become a `SyncError` at all -
/// they stop at the logging boundary in `sync::spawn_detached`.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No identity resolved; fatal precondition for every operation.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Missing or invalid field; reported to the caller, never retried.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Record absent after exhausting the tiers an operation requires.
    #[error("Record not found")]
    NotFound,

    /// Mutation attempted on a record the caller does not own.
    #[error("Not authorized to modify this record")]
    Ownership,

    /// Network or backend failure on a path with no local fallback.
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),
}
