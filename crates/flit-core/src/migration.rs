//! Migration units and their discovery.

use crate::checksum::fingerprint;
use crate::error::{FlitError, FlitResult};
use crate::source::MigrationSource;
use std::collections::HashSet;

/// One migration file, loaded for a single `migrate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Name within its source, e.g. `001-create-users.sql`
    pub name: String,
    /// `fingerprint(name)`, the value stored in the tracking table
    pub fingerprint: String,
    /// SQL executed as a single statement
    pub sql: String,
}

impl Migration {
    /// Build a migration, deriving its fingerprint from `name`
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            fingerprint: fingerprint(&name),
            name,
            sql: sql.into(),
        }
    }
}

/// List and read every migration in `source` matching `pattern`.
///
/// Fails on the first unreadable file or repeated name; nothing is returned
/// partially.
pub fn load_migrations(
    source: &dyn MigrationSource,
    pattern: &str,
) -> FlitResult<Vec<Migration>> {
    let mut seen = HashSet::new();
    let mut migrations = Vec::new();

    for name in source.list(pattern)? {
        if !seen.insert(name.clone()) {
            return Err(FlitError::Discovery {
                pattern: pattern.to_string(),
                message: format!("migration '{}' listed more than once", name),
            });
        }
        let sql = source.read(&name)?;
        migrations.push(Migration::new(name, sql));
    }

    log::debug!(
        "Discovered {} migration(s) matching '{}'",
        migrations.len(),
        pattern
    );
    Ok(migrations)
}

/// Migrations whose fingerprint is not in `applied`, sorted by name.
///
/// Names compare byte-wise, so `002-first.sql` sorts before `01-second.sql`.
pub fn pending<'a>(migrations: &'a [Migration], applied: &HashSet<String>) -> Vec<&'a Migration> {
    let mut pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !applied.contains(&m.fingerprint))
        .collect();
    pending.sort_by(|a, b| a.name.cmp(&b.name));
    pending
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
