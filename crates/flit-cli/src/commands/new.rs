//! New command implementation

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalArgs, NewArgs};

/// Suffix of every scaffolded migration file name
const FILE_SUFFIX: &str = "new-migration.sql";

/// Execute the new command
pub async fn execute(args: &NewArgs, _global: &GlobalArgs) -> Result<()> {
    let path = create_migration(&args.dir, Local::now())?;
    println!("{}", path.display());
    Ok(())
}

/// File name for a migration created at `now`
pub(crate) fn migration_file_name(now: DateTime<Local>) -> String {
    format!("{}-{}", now.format("%Y%m%d%H%M%S"), FILE_SUFFIX)
}

/// Create an empty migration file in `dir`, returning its path.
///
/// Fails if `dir` is missing or not a directory, or if a file with the same
/// timestamp already exists.
pub(crate) fn create_migration(dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    let metadata =
        std::fs::metadata(dir).with_context(|| format!("stat {}", dir.display()))?;
    if !metadata.is_dir() {
        bail!("stat {}: not a directory", dir.display());
    }

    let path = dir.join(migration_file_name(now));
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("create {}", path.display()))?;

    log::debug!("Created {}", path.display());
    Ok(path)
}

#[cfg(test)]
#[path = "new_test.rs"]
mod tests;
