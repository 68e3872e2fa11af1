//! The `flits` tracking table.
//!
//! One row per applied migration, keyed by the migration's fingerprint. Rows
//! are only ever inserted.

use crate::error::{FlitError, FlitResult};
use crate::migration::Migration;
use flit_db::{Connection, DbError};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Name of the tracking table
pub const TABLE: &str = "flits";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS flits (sum CHAR(64) PRIMARY KEY)";
const SELECT_APPLIED: &str = "SELECT sum FROM flits";
const INSERT_APPLIED: &str = "INSERT INTO flits (sum) VALUES (?)";

/// Create the tracking table unless it already exists.
pub async fn ensure_table(cancel: &CancellationToken, conn: &mut dyn Connection) -> FlitResult<()> {
    conn.execute(cancel, CREATE_TABLE, &[])
        .await
        .map_err(|source| FlitError::State {
            action: "create",
            source,
        })?;
    Ok(())
}

/// Fingerprints of every migration recorded as applied.
pub async fn list_applied(
    cancel: &CancellationToken,
    conn: &mut dyn Connection,
) -> FlitResult<HashSet<String>> {
    let sums = conn
        .query_column(cancel, SELECT_APPLIED, &[])
        .await
        .map_err(|source| FlitError::State {
            action: "read",
            source,
        })?;
    // CHAR(64) may come back space-padded on some engines.
    Ok(sums.into_iter().map(|s| s.trim_end().to_string()).collect())
}

/// Record `migration` as applied.
///
/// A uniqueness violation means another caller recorded the same migration
/// while this one was applying it, which only happens when callers do not
/// share a guard.
pub async fn record_applied(
    cancel: &CancellationToken,
    conn: &mut dyn Connection,
    migration: &Migration,
) -> FlitResult<()> {
    match conn
        .execute(cancel, INSERT_APPLIED, &[migration.fingerprint.as_str()])
        .await
    {
        Ok(_) => Ok(()),
        Err(DbError::UniqueViolation(_)) => Err(FlitError::DuplicateRecord {
            name: migration.name.clone(),
            fingerprint: migration.fingerprint.clone(),
        }),
        Err(source) => Err(FlitError::Record {
            name: migration.name.clone(),
            source,
        }),
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
