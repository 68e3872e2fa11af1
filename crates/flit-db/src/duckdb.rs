//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Connection, Database};
use async_trait::async_trait;
use duckdb::params_from_iter;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// DuckDB database backend
///
/// Holds a root connection; every [`Database::connect`] clones it, so all
/// connections see the same database (including in-memory ones).
pub struct DuckDbBackend {
    conn: Mutex<duckdb::Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB database
    pub fn in_memory() -> DbResult<Self> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (or create) a DuckDB database file
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = duckdb::Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Execute one or more statements on the root connection
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    /// Count the rows a query returns
    pub fn query_count(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count as usize)
    }

    /// Check if a table or view exists in the `main` schema
    pub fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'main' AND table_name = ?",
                [name],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count > 0)
    }

    fn lock(&self) -> DbResult<std::sync::MutexGuard<'_, duckdb::Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn clone_sync(&self) -> DbResult<duckdb::Connection> {
        let conn = self.lock()?;
        conn.try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn connect(&self, cancel: &CancellationToken) -> DbResult<Box<dyn Connection>> {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        let conn = self.clone_sync()?;
        Ok(Box::new(DuckDbConnection { conn }))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// One DuckDB connection checked out by [`DuckDbBackend::connect`].
///
/// DuckDB calls are synchronous and cannot be interrupted, so cancellation is
/// observed between statements only.
pub struct DuckDbConnection {
    conn: duckdb::Connection,
}

impl DuckDbConnection {
    fn execute_sync(&self, sql: &str, params: &[&str]) -> DbResult<u64> {
        let changed = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(changed as u64)
    }

    fn query_column_sync(&self, sql: &str, params: &[&str]) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            row.get::<_, String>(0)
        })?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }
}

#[async_trait]
impl Connection for DuckDbConnection {
    async fn execute(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[&str],
    ) -> DbResult<u64> {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        self.execute_sync(sql, params)
    }

    async fn query_column(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[&str],
    ) -> DbResult<Vec<String>> {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        self.query_column_sync(sql, params)
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        let DuckDbConnection { conn } = *self;
        conn.close()
            .map_err(|(_, e)| DbError::ConnectionError(e.to_string()))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
