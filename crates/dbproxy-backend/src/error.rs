use thiserror::Error;

/// Failure surfaced by a single [`crate::BackendExecutor`] call.
///
/// The node name is attached by the caller (the registry/facade knows which
/// node it was talking to); the executor itself only reports what went wrong.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("ping failed: {0}")]
    Ping(String),
}
