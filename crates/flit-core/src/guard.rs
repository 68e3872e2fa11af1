//! Concurrency guards around the apply critical section.
//!
//! A [`Guard`] decides who may run the read-diff-apply-record cycle at a
//! time. Every guard follows the same contract: enter, run the section,
//! always leave, and report both a section failure and a leave failure when
//! both happen.

use crate::error::{FlitError, FlitResult};
use async_trait::async_trait;
use flit_db::Connection;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Lock name used by [`MySqlLockGuard::default`]
pub const DEFAULT_LOCK_NAME: &str = "flit";

/// Work that must not overlap with any other section under the same guard.
#[async_trait]
pub trait CriticalSection: Send {
    /// Run the section on the connection the guard was entered with.
    async fn run(&mut self, cancel: &CancellationToken, conn: &mut dyn Connection)
        -> FlitResult<()>;
}

/// Mutual-exclusion strategy for [`Migrator`](crate::Migrator).
///
/// The connection is passed through because session-scoped locks must be
/// taken on the same session that runs the section.
#[async_trait]
pub trait Guard: Send + Sync {
    /// Run `section` while holding the guard.
    async fn guard(
        &self,
        cancel: &CancellationToken,
        conn: &mut dyn Connection,
        section: &mut dyn CriticalSection,
    ) -> FlitResult<()>;
}

/// In-process mutual exclusion.
///
/// Serializes callers that share this instance. Separate processes (or
/// separate instances) are not coordinated.
#[derive(Debug, Default)]
pub struct LocalMutexGuard {
    lock: Mutex<()>,
}

impl LocalMutexGuard {
    /// Create an unlocked guard
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Guard for LocalMutexGuard {
    async fn guard(
        &self,
        cancel: &CancellationToken,
        conn: &mut dyn Connection,
        section: &mut dyn CriticalSection,
    ) -> FlitResult<()> {
        let _held = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FlitError::Guard {
                    message: "cancelled while waiting for the local migration lock".to_string(),
                });
            }
            held = self.lock.lock() => held,
        };

        section.run(cancel, conn).await
    }
}

/// Cross-process mutual exclusion using MySQL's `GET_LOCK` and
/// `RELEASE_LOCK`.
///
/// The lock is server-wide and tied to the session, so any number of
/// processes or hosts migrating the same server take turns.
#[derive(Debug, Clone)]
pub struct MySqlLockGuard {
    name: String,
}

impl MySqlLockGuard {
    /// Guard on the named server lock
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The server lock name
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn lock(&self, cancel: &CancellationToken, conn: &mut dyn Connection) -> FlitResult<()> {
        // A timeout of -1 waits forever; only the token ends the wait.
        let rows = conn
            .query_column(
                cancel,
                "SELECT COALESCE(GET_LOCK(?, -1), 0)",
                &[self.name.as_str()],
            )
            .await
            .map_err(|e| FlitError::Guard {
                message: if e.is_cancelled() {
                    format!("cancelled while waiting for lock '{}'", self.name)
                } else {
                    format!("GET_LOCK('{}'): {}", self.name, e)
                },
            })?;

        match rows.first().map(String::as_str) {
            Some("1") => {
                log::debug!("Acquired lock '{}'", self.name);
                Ok(())
            }
            other => Err(FlitError::Guard {
                message: format!(
                    "GET_LOCK('{}') returned {}",
                    self.name,
                    other.unwrap_or("no rows")
                ),
            }),
        }
    }

    async fn unlock(&self, conn: &mut dyn Connection) -> FlitResult<()> {
        // The caller's token may already be cancelled; the lock must still
        // be released before the connection goes back to a pool.
        let rows = conn
            .query_column(
                &CancellationToken::new(),
                "SELECT COALESCE(RELEASE_LOCK(?), 0)",
                &[self.name.as_str()],
            )
            .await
            .map_err(|e| FlitError::Guard {
                message: format!("RELEASE_LOCK('{}'): {}", self.name, e),
            })?;

        match rows.first().map(String::as_str) {
            Some("1") => {
                log::debug!("Released lock '{}'", self.name);
                Ok(())
            }
            other => Err(FlitError::Guard {
                message: format!(
                    "RELEASE_LOCK('{}') returned {}; the lock was not held by this session",
                    self.name,
                    other.unwrap_or("no rows")
                ),
            }),
        }
    }
}

impl Default for MySqlLockGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_NAME)
    }
}

#[async_trait]
impl Guard for MySqlLockGuard {
    async fn guard(
        &self,
        cancel: &CancellationToken,
        conn: &mut dyn Connection,
        section: &mut dyn CriticalSection,
    ) -> FlitResult<()> {
        self.lock(cancel, conn).await?;
        let body = section.run(cancel, conn).await;
        let release = self.unlock(conn).await;
        FlitError::join(body, release)
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
