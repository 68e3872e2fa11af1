//! Configuration types and parsing for flit.yml

use crate::error::{FlitError, FlitResult};
use crate::guard::{Guard, LocalMutexGuard, MySqlLockGuard, DEFAULT_LOCK_NAME};
use crate::migrator::{MigratorConfig, DEFAULT_GLOB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the configuration file looked up in a directory
pub const CONFIG_FILE: &str = "flit.yml";

/// Project configuration from flit.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database URL (`duckdb:<path>`, `:memory:`, `mysql://...`)
    #[serde(default)]
    pub database: Option<String>,

    /// Where migrations live and which ones to pick up
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Concurrency guard around the apply loop
    #[serde(default)]
    pub guard: GuardKind,

    /// Server lock name for the `mysql` guard
    #[serde(default = "default_lock_name")]
    pub lock_name: String,

    /// Wrap each migration and its record in a transaction
    #[serde(default)]
    pub transactional: bool,

    /// Directory relative paths are resolved against (the config file's
    /// directory)
    #[serde(skip)]
    pub root: PathBuf,
}

/// Migration file location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationsConfig {
    /// Directory holding migration files
    #[serde(default = "default_migrations_dir")]
    pub dir: String,

    /// Glob selecting migrations within `dir`
    #[serde(default = "default_glob")]
    pub glob: String,
}

/// Guard implementations selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardKind {
    /// In-process mutex
    #[default]
    Mutex,
    /// MySQL GET_LOCK/RELEASE_LOCK
    Mysql,
}

fn default_lock_name() -> String {
    DEFAULT_LOCK_NAME.to_string()
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_glob() -> String {
    DEFAULT_GLOB.to_string()
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
            glob: default_glob(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            migrations: MigrationsConfig::default(),
            guard: GuardKind::default(),
            lock_name: default_lock_name(),
            transactional: false,
            root: PathBuf::from("."),
        }
    }
}

impl GuardKind {
    /// Build a fresh guard of this kind
    pub fn build(self, lock_name: &str) -> Arc<dyn Guard> {
        match self {
            GuardKind::Mutex => Arc::new(LocalMutexGuard::new()),
            GuardKind::Mysql => Arc::new(MySqlLockGuard::new(lock_name)),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> FlitResult<Self> {
        if !path.exists() {
            return Err(FlitError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FlitError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config: Config =
            serde_yaml::from_str(&content).map_err(|e| FlitError::ConfigParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        config.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Load `flit.yml` from a directory, falling back to defaults when the
    /// directory has none
    pub fn load_from_dir(dir: &Path) -> FlitResult<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            log::debug!("No {} in {}, using defaults", CONFIG_FILE, dir.display());
            Ok(Self {
                root: dir.to_path_buf(),
                ..Self::default()
            })
        }
    }

    /// Absolute (or root-relative) path of the migrations directory
    pub fn migrations_path(&self) -> PathBuf {
        self.root.join(&self.migrations.dir)
    }

    /// Engine settings described by this configuration
    pub fn migrator_config(&self) -> MigratorConfig {
        MigratorConfig::default()
            .glob(self.migrations.glob.clone())
            .guard(self.guard.build(&self.lock_name))
            .transactional(self.transactional)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
