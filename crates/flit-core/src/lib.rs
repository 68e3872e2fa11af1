//! flit-core - Core library for flit
//!
//! flit applies SQL migration files to a database exactly once each. The
//! database itself records which migrations have run (in the `flits` table),
//! and a pluggable [`Guard`] keeps concurrent callers from applying the same
//! migration twice.
//!
//! ```rust,ignore
//! use flit_core::{DirSource, Migrator};
//! use tokio_util::sync::CancellationToken;
//!
//! let db = flit_db::open("duckdb:app.duckdb").await?;
//! let migrator = Migrator::new(db, DirSource::new("migrations"));
//! let applied = migrator.migrate(&CancellationToken::new()).await?;
//! println!("{applied:?}");
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod guard;
pub mod migration;
pub mod migrator;
pub mod source;
pub mod state;

pub use checksum::fingerprint;
pub use config::{Config, GuardKind};
pub use error::{ErrorKind, FlitError, FlitResult, MigrateError};
pub use guard::{CriticalSection, Guard, LocalMutexGuard, MySqlLockGuard};
pub use migration::{load_migrations, Migration};
pub use migrator::{Migrator, MigratorConfig, DEFAULT_GLOB};
#[cfg(feature = "embed")]
pub use source::EmbeddedSource;
pub use source::{DirSource, MemorySource, MigrationSource};
