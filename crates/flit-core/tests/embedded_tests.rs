//! Migrations compiled into the test binary.

#![cfg(feature = "embed")]

use flit_core::{EmbeddedSource, MigrationSource, Migrator};
use flit_db::DuckDbBackend;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(rust_embed::Embed)]
#[folder = "tests/fixtures/example/"]
struct Example;

#[test]
fn test_embedded_listing() {
    let source = EmbeddedSource::<Example>::new();
    let mut names = source.list("*.sql").unwrap();
    names.sort();
    assert_eq!(names, vec!["001-first.sql", "002-second.sql"]);
    assert!(source.read("README.md").is_ok());
    assert!(source.read("003-missing.sql").is_err());
}

#[tokio::test]
async fn test_embedded_migrate() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let migrator = Migrator::new(db.clone(), EmbeddedSource::<Example>::new());

    let applied = migrator.migrate(&CancellationToken::new()).await.unwrap();
    assert_eq!(applied, vec!["001-first.sql", "002-second.sql"]);
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 1);
}
