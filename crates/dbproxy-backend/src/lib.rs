//! Backend execution capability fronted by the proxy core.
//!
//! The core depends only on [`BackendExecutor`]: acquire a connection,
//! execute, release on every exit path. This keeps routing, journaling and
//! health-checking testable against [`fake::FakeBackend`] without a real
//! Postgres instance, while [`pg::PgBackend`] supplies the real thing.

mod error;
mod fake;
mod pg;
mod scalar;
mod statement;

pub use error::BackendError;
pub use fake::FakeBackend;
pub use pg::PgBackend;
pub use scalar::Scalar;
pub use statement::{QueryResult, Row, Statement};

use async_trait::async_trait;

/// Capability every node in the registry fronts.
///
/// Implementations must scope every call to an acquired connection that is
/// released on all exit paths (success, error, or cancellation) — the core
/// never manages connection lifetime itself.
#[async_trait]
pub trait BackendExecutor: Send + Sync {
    /// Lightweight liveness probe (`SELECT 1` for `PgBackend`).
    async fn ping(&self) -> Result<(), BackendError>;

    /// Execute a single statement outside any caller-visible transaction.
    async fn execute(&self, stmt: &Statement) -> Result<QueryResult, BackendError>;

    /// Execute a sequence of statements inside one transaction; commits only
    /// if every statement succeeds, otherwise rolls back the whole sequence.
    async fn execute_in_transaction(&self, stmts: &[Statement]) -> Result<QueryResult, BackendError>;
}
