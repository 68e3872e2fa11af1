//! Database trait definitions

use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A database that hands out exclusive connections.
///
/// Implementations must be Send + Sync so one handle can serve concurrent
/// callers.
#[async_trait]
pub trait Database: Send + Sync {
    /// Open (or check out) a connection owned by the caller until `close`.
    async fn connect(&self, cancel: &CancellationToken) -> DbResult<Box<dyn Connection>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// A single database session.
///
/// Session-scoped state (advisory locks, open transactions) lives as long as
/// the connection, so callers must not share one between concurrent tasks.
#[async_trait]
pub trait Connection: Send {
    /// Execute one statement that returns no rows, binding `params` to `?`
    /// placeholders. Returns the affected row count.
    async fn execute(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[&str],
    ) -> DbResult<u64>;

    /// Run a query and return the first column of every row as text.
    async fn query_column(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[&str],
    ) -> DbResult<Vec<String>>;

    /// Release the connection. A connection interrupted mid-statement is
    /// discarded instead of being reused.
    async fn close(self: Box<Self>) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Drive `fut` to completion unless `cancel` fires first.
///
/// When the token wins, `fut` is dropped and `DbError::Cancelled` is returned.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DbError::Cancelled),
        result = fut => result,
    }
}
