//! The migration engine.

use crate::error::{FlitError, FlitResult, MigrateError};
use crate::guard::{CriticalSection, Guard, LocalMutexGuard};
use crate::migration::{load_migrations, pending, Migration};
use crate::source::MigrationSource;
use crate::state;
use async_trait::async_trait;
use flit_db::{Connection, Database};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Pattern used when none is configured: `.sql` files at the source root.
pub const DEFAULT_GLOB: &str = "*.sql";

/// Settings fixed when a [`Migrator`] is built.
#[derive(Clone)]
pub struct MigratorConfig {
    /// Glob selecting migration names within the source.
    /// Default: [`DEFAULT_GLOB`].
    pub glob: String,

    /// Mutual exclusion around the apply loop. Default: a new
    /// [`LocalMutexGuard`] owned by this config, so migrators built from
    /// separate default configs do not coordinate. Clone one `Arc` into
    /// several configs to share a scope.
    pub guard: Arc<dyn Guard>,

    /// Run each migration and its tracking insert inside one transaction, so
    /// a migration is never applied without being recorded. Only useful on
    /// engines with transactional DDL (DuckDB, PostgreSQL). Default: `false`.
    pub transactional: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            glob: DEFAULT_GLOB.to_string(),
            guard: Arc::new(LocalMutexGuard::new()),
            transactional: false,
        }
    }
}

impl fmt::Debug for MigratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorConfig")
            .field("glob", &self.glob)
            .field("transactional", &self.transactional)
            .finish_non_exhaustive()
    }
}

impl MigratorConfig {
    /// Select migrations with `glob` instead of [`DEFAULT_GLOB`]
    pub fn glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = glob.into();
        self
    }

    /// Guard the apply loop with `guard`
    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guard = guard;
        self
    }

    /// Wrap each migration and its record in a transaction
    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }
}

/// Applies pending migrations from a source to a database.
pub struct Migrator {
    db: Arc<dyn Database>,
    source: Box<dyn MigrationSource>,
    config: MigratorConfig,
}

impl Migrator {
    /// Create a migrator with the default configuration
    pub fn new(db: Arc<dyn Database>, source: impl MigrationSource + 'static) -> Self {
        Self::with_config(db, source, MigratorConfig::default())
    }

    /// Create a migrator with an explicit configuration
    pub fn with_config(
        db: Arc<dyn Database>,
        source: impl MigrationSource + 'static,
        config: MigratorConfig,
    ) -> Self {
        Self {
            db,
            source: Box::new(source),
            config,
        }
    }

    /// The configuration this migrator was built with
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Apply pending migrations and return their names in the order applied.
    ///
    /// Every migration matching the configured glob is loaded first; the
    /// database is not touched if any of them cannot be read. Inside the
    /// guard, the `flits` tracking table is created if needed, migrations
    /// whose fingerprint is already recorded are skipped, and the rest run
    /// in byte-wise name order, each as a single statement followed by an
    /// insert of its fingerprint.
    ///
    /// The first failure stops the run. Migrations applied before it stay
    /// applied and are listed in [`MigrateError::applied`]; calling again
    /// after fixing the cause resumes where the run stopped.
    pub async fn migrate(&self, cancel: &CancellationToken) -> Result<Vec<String>, MigrateError> {
        let migrations = load_migrations(self.source.as_ref(), &self.config.glob)
            .map_err(|e| MigrateError::new(Vec::new(), e))?;

        let mut conn = self
            .db
            .connect(cancel)
            .await
            .map_err(|e| MigrateError::new(Vec::new(), FlitError::Connection(e)))?;

        let mut section = ApplyPending {
            migrations: &migrations,
            transactional: self.config.transactional,
            applied: Vec::new(),
        };
        let result = self
            .config
            .guard
            .guard(cancel, conn.as_mut(), &mut section)
            .await;

        if let Err(e) = conn.close().await {
            log::warn!("Failed to close {} connection: {}", self.db.db_type(), e);
        }

        match result {
            Ok(()) => Ok(section.applied),
            Err(error) => Err(MigrateError::new(section.applied, error)),
        }
    }
}

/// The read-diff-apply-record cycle run under the guard.
struct ApplyPending<'a> {
    migrations: &'a [Migration],
    transactional: bool,
    applied: Vec<String>,
}

impl ApplyPending<'_> {
    async fn apply(
        &self,
        cancel: &CancellationToken,
        conn: &mut dyn Connection,
        migration: &Migration,
    ) -> FlitResult<()> {
        conn.execute(cancel, &migration.sql, &[])
            .await
            .map_err(|source| FlitError::Apply {
                name: migration.name.clone(),
                source,
            })?;
        state::record_applied(cancel, conn, migration).await
    }

    async fn apply_in_transaction(
        &self,
        cancel: &CancellationToken,
        conn: &mut dyn Connection,
        migration: &Migration,
    ) -> FlitResult<()> {
        let txn_error = |source| FlitError::Apply {
            name: migration.name.clone(),
            source,
        };

        conn.execute(cancel, "BEGIN", &[]).await.map_err(txn_error)?;

        match self.apply(cancel, conn, migration).await {
            Ok(()) => {
                conn.execute(cancel, "COMMIT", &[]).await.map_err(txn_error)?;
                Ok(())
            }
            Err(err) => {
                // Roll back even if the caller gave up.
                let rollback = conn
                    .execute(&CancellationToken::new(), "ROLLBACK", &[])
                    .await
                    .map(|_| ())
                    .map_err(txn_error);
                FlitError::join(Err(err), rollback)
            }
        }
    }
}

#[async_trait]
impl<'a> CriticalSection for ApplyPending<'a> {
    async fn run(
        &mut self,
        cancel: &CancellationToken,
        conn: &mut dyn Connection,
    ) -> FlitResult<()> {
        state::ensure_table(cancel, conn).await?;
        let applied = state::list_applied(cancel, conn).await?;
        let pending = pending(self.migrations, &applied);

        log::debug!(
            "{} of {} migration(s) pending",
            pending.len(),
            self.migrations.len()
        );

        for migration in pending {
            if self.transactional {
                self.apply_in_transaction(cancel, conn, migration).await?;
            } else {
                self.apply(cancel, conn, migration).await?;
            }
            log::info!("Applied migration {}", migration.name);
            self.applied.push(migration.name.clone());
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
