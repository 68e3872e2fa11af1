//! Error types for flit-core

use flit_db::DbError;
use std::fmt;
use thiserror::Error;

/// Broad classification of a [`FlitError`], for callers that branch on the
/// stage that failed rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Listing or reading migration files, before any database access
    Discovery,
    /// Obtaining a database connection
    Connection,
    /// Entering or leaving the concurrency guard
    Guard,
    /// Creating, reading, or writing the tracking table
    State,
    /// Executing a migration body
    Apply,
    /// Loading the configuration file
    Config,
}

/// Core error type for flit
#[derive(Error, Debug)]
pub enum FlitError {
    /// F001: Invalid glob pattern or failed directory listing
    #[error("[F001] Migration discovery failed for '{pattern}': {message}")]
    Discovery { pattern: String, message: String },

    /// F002: A matched migration could not be read
    #[error("[F002] Failed to read migration '{name}': {message}")]
    Read { name: String, message: String },

    /// F003: No database connection could be obtained
    #[error("[F003] Database connection failed: {0}")]
    Connection(#[source] DbError),

    /// F004: Lock acquisition or release failed
    #[error("[F004] Migration guard failed: {message}")]
    Guard { message: String },

    /// F005: Tracking table DDL or query failed
    #[error("[F005] Tracking table {action} failed: {source}")]
    State {
        action: &'static str,
        #[source]
        source: DbError,
    },

    /// F006: Recording an applied migration failed
    #[error("[F006] record {name}: {source}")]
    Record {
        name: String,
        #[source]
        source: DbError,
    },

    /// F007: The fingerprint was already recorded, so another caller applied
    /// the same migration concurrently
    #[error("[F007] record {name}: fingerprint {fingerprint} is already recorded; migrations ran without a shared guard")]
    DuplicateRecord { name: String, fingerprint: String },

    /// F008: A migration body failed to execute
    #[error("[F008] apply {name}: {source}")]
    Apply {
        name: String,
        #[source]
        source: DbError,
    },

    /// F009: Configuration file not found
    #[error("[F009] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// F010: Configuration file could not be read or parsed
    #[error("[F010] Failed to parse config {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Several errors that occurred together, such as a failed critical
    /// section followed by a failed unlock
    #[error("{}", JoinedDisplay(.0))]
    Joined(Vec<FlitError>),
}

/// Result type alias for FlitError
pub type FlitResult<T> = Result<T, FlitError>;

struct JoinedDisplay<'a>(&'a [FlitError]);

impl fmt::Display for JoinedDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl FlitError {
    /// The stage this error belongs to. A joined error reports its first
    /// member's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlitError::Discovery { .. } | FlitError::Read { .. } => ErrorKind::Discovery,
            FlitError::Connection(_) => ErrorKind::Connection,
            FlitError::Guard { .. } => ErrorKind::Guard,
            FlitError::State { .. }
            | FlitError::Record { .. }
            | FlitError::DuplicateRecord { .. } => ErrorKind::State,
            FlitError::Apply { .. } => ErrorKind::Apply,
            FlitError::ConfigNotFound { .. } | FlitError::ConfigParse { .. } => ErrorKind::Config,
            FlitError::Joined(errors) => errors
                .first()
                .map(FlitError::kind)
                .unwrap_or(ErrorKind::Guard),
        }
    }

    /// Iterate over the individual errors, flattening joined ones.
    pub fn errors(&self) -> Box<dyn Iterator<Item = &FlitError> + '_> {
        match self {
            FlitError::Joined(errors) => Box::new(errors.iter().flat_map(FlitError::errors)),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Combine the outcome of a guarded body with the outcome of releasing
    /// the guard. Neither error is dropped.
    pub fn join(body: FlitResult<()>, release: FlitResult<()>) -> FlitResult<()> {
        match (body, release) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Err(body), Err(release)) => Err(FlitError::Joined(vec![body, release])),
        }
    }
}

/// Failure of [`Migrator::migrate`](crate::Migrator::migrate).
///
/// Migrations applied before the failure stay applied and recorded; their
/// names are kept in `applied`.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct MigrateError {
    /// Names applied before the failure, in application order
    pub applied: Vec<String>,
    /// What went wrong
    pub error: FlitError,
}

impl MigrateError {
    pub(crate) fn new(applied: Vec<String>, error: FlitError) -> Self {
        Self { applied, error }
    }

    /// Shorthand for `self.error.kind()`
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
