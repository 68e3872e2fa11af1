//! Migrate command implementation

use anyhow::{anyhow, Context, Result};
use flit_core::{Config, DirSource, Migrator};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalArgs, MigrateArgs};

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let config = resolve_config(args, global)?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, stopping after the current statement");
                cancel.cancel();
            }
        })
    };

    let result = run(&config, &cancel).await;
    interrupt.abort();

    let applied = result?;
    if applied.is_empty() && global.verbose {
        println!("No pending migrations");
    }
    Ok(())
}

/// Load the config file and apply command-line overrides on top of it.
pub(crate) fn resolve_config(args: &MigrateArgs, global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load(path).context("Failed to load config")?,
        None => Config::load_from_dir(Path::new(".")).context("Failed to load config")?,
    };

    if let Some(database) = &args.database {
        config.database = Some(database.clone());
    }
    if let Some(dir) = &args.dir {
        // Flags are relative to the working directory, not the config file.
        config.root = ".".into();
        config.migrations.dir = dir.to_string_lossy().into_owned();
    }
    if let Some(glob) = &args.glob {
        config.migrations.glob = glob.clone();
    }
    if let Some(guard) = args.guard {
        config.guard = guard.into();
    }
    if let Some(lock_name) = &args.lock_name {
        config.lock_name = lock_name.clone();
    }
    if args.transactional {
        config.transactional = true;
    }

    Ok(config)
}

/// Apply pending migrations described by `config`, printing each applied
/// name. Names applied before a failure are printed too.
pub(crate) async fn run(config: &Config, cancel: &CancellationToken) -> Result<Vec<String>> {
    let url = config.database.as_deref().ok_or_else(|| {
        anyhow!("No database configured: pass --database, set FLIT_DATABASE_URL, or set `database` in flit.yml")
    })?;

    let db = flit_db::open(url)
        .await
        .with_context(|| format!("Failed to open database '{}'", url))?;
    let source = DirSource::new(config.migrations_path());
    log::debug!(
        "Migrating {} ({}) from {}",
        db.db_type(),
        config.migrations.glob,
        source.root().display()
    );

    let migrator = Migrator::with_config(db, source, config.migrator_config());
    match migrator.migrate(cancel).await {
        Ok(applied) => {
            for name in &applied {
                println!("{}", name);
            }
            Ok(applied)
        }
        Err(err) => {
            for name in &err.applied {
                println!("{}", name);
            }
            Err(anyhow::Error::new(err.error).context("Migration failed"))
        }
    }
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
