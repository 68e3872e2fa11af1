//! flit-db - Database connection layer for flit
//!
//! This crate provides the `Database` and `Connection` traits consumed by the
//! migration engine, with implementations for DuckDB and (behind the `mysql`
//! feature) MySQL.

pub mod duckdb;
pub mod error;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod traits;

use std::sync::Arc;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;
pub use traits::{cancellable, Connection, Database};

/// Open a database from a connection URL.
///
/// - `:memory:` or `duckdb::memory:` opens an in-memory DuckDB database
/// - `duckdb:<path>` or a bare path opens a DuckDB file
/// - `mysql://...` connects a MySQL pool (requires the `mysql` feature)
pub async fn open(url: &str) -> DbResult<Arc<dyn Database>> {
    if url.starts_with("mysql://") {
        return open_mysql(url).await;
    }

    let path = url.strip_prefix("duckdb:").unwrap_or(url);
    if path.is_empty() {
        return Err(DbError::ConnectionError(format!(
            "missing database path in '{}'",
            url
        )));
    }
    Ok(Arc::new(DuckDbBackend::new(path)?))
}

#[cfg(feature = "mysql")]
async fn open_mysql(url: &str) -> DbResult<Arc<dyn Database>> {
    Ok(Arc::new(MySqlBackend::connect(url).await?))
}

#[cfg(not(feature = "mysql"))]
async fn open_mysql(_url: &str) -> DbResult<Arc<dyn Database>> {
    Err(DbError::Unsupported {
        backend: "mysql".to_string(),
        feature: "mysql".to_string(),
    })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
