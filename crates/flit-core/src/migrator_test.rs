use super::*;
use crate::error::ErrorKind;
use crate::source::MemorySource;
use flit_db::{DbError, DuckDbBackend};

fn duckdb() -> Arc<DuckDbBackend> {
    Arc::new(DuckDbBackend::in_memory().unwrap())
}

fn five_migrations(third: &str) -> MemorySource {
    MemorySource::new()
        .with("001.sql", "CREATE TABLE t (id INT)")
        .with("002.sql", "INSERT INTO t VALUES (1)")
        .with("003.sql", third)
        .with("004.sql", "INSERT INTO t VALUES (3)")
        .with("005.sql", "INSERT INTO t VALUES (4)")
}

#[tokio::test]
async fn test_migrate_twice_is_idempotent() {
    let db = duckdb();
    let source = MemorySource::new()
        .with("001-first.sql", "CREATE TABLE t (id INT)")
        .with("002-second.sql", "INSERT INTO t VALUES (1)");
    let migrator = Migrator::new(db.clone(), source);
    let token = CancellationToken::new();

    let applied = migrator.migrate(&token).await.unwrap();
    assert_eq!(applied, vec!["001-first.sql", "002-second.sql"]);

    let applied = migrator.migrate(&token).await.unwrap();
    assert!(applied.is_empty());

    assert_eq!(db.query_count("SELECT * FROM flits").unwrap(), 2);
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 1);
}

#[tokio::test]
async fn test_migrate_orders_by_name_not_discovery() {
    let source = MemorySource::new()
        .with("01-second.sql", "CREATE TABLE second (id INT)")
        .with("002-first.sql", "CREATE TABLE first (id INT)");
    let migrator = Migrator::new(duckdb(), source);

    let applied = migrator.migrate(&CancellationToken::new()).await.unwrap();
    assert_eq!(applied, vec!["002-first.sql", "01-second.sql"]);
}

#[tokio::test]
async fn test_migrate_empty_source_creates_table() {
    let db = duckdb();
    let migrator = Migrator::new(db.clone(), MemorySource::new());

    let applied = migrator.migrate(&CancellationToken::new()).await.unwrap();
    assert!(applied.is_empty());
    assert!(db.relation_exists("flits").unwrap());
}

#[tokio::test]
async fn test_migrate_stops_at_first_failure_and_resumes() {
    let db = duckdb();
    let token = CancellationToken::new();

    let broken = Migrator::new(db.clone(), five_migrations("THIS IS NOT SQL"));
    let err = broken.migrate(&token).await.unwrap_err();

    assert_eq!(err.applied, vec!["001.sql", "002.sql"]);
    assert_eq!(err.kind(), ErrorKind::Apply);
    match &err.error {
        FlitError::Apply { name, .. } => assert_eq!(name, "003.sql"),
        other => panic!("expected Apply, got {other:?}"),
    }
    assert_eq!(db.query_count("SELECT * FROM flits").unwrap(), 2);

    let fixed = Migrator::new(db.clone(), five_migrations("INSERT INTO t VALUES (2)"));
    let applied = fixed.migrate(&token).await.unwrap();
    assert_eq!(applied, vec!["003.sql", "004.sql", "005.sql"]);

    assert_eq!(db.query_count("SELECT * FROM flits").unwrap(), 5);
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 4);
}

#[tokio::test]
async fn test_edited_migration_is_not_reapplied() {
    let db = duckdb();
    let token = CancellationToken::new();

    let original = MemorySource::new().with("001.sql", "CREATE TABLE t (id INT)");
    Migrator::new(db.clone(), original)
        .migrate(&token)
        .await
        .unwrap();

    let edited = MemorySource::new().with("001.sql", "CREATE TABLE t (id INT, name VARCHAR)");
    let applied = Migrator::new(db.clone(), edited)
        .migrate(&token)
        .await
        .unwrap();
    assert!(applied.is_empty());
}

#[tokio::test]
async fn test_renamed_migration_is_reapplied() {
    let db = duckdb();
    let token = CancellationToken::new();

    let original = MemorySource::new().with("001.sql", "INSERT INTO log VALUES (1)");
    db.execute_batch("CREATE TABLE log (id INT)").unwrap();
    Migrator::new(db.clone(), original)
        .migrate(&token)
        .await
        .unwrap();

    let renamed = MemorySource::new().with("001-renamed.sql", "INSERT INTO log VALUES (1)");
    let applied = Migrator::new(db.clone(), renamed)
        .migrate(&token)
        .await
        .unwrap();
    assert_eq!(applied, vec!["001-renamed.sql"]);
    assert_eq!(db.query_count("SELECT * FROM log").unwrap(), 2);
}

#[tokio::test]
async fn test_discovery_failure_touches_nothing() {
    let db = duckdb();
    let config = MigratorConfig::default().glob("[");
    let migrator = Migrator::with_config(db.clone(), MemorySource::new(), config);

    let err = migrator
        .migrate(&CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Discovery);
    assert!(err.applied.is_empty());
    assert!(!db.relation_exists("flits").unwrap());
}

#[tokio::test]
async fn test_cancelled_before_start_applies_nothing() {
    let db = duckdb();
    let source = MemorySource::new().with("001.sql", "CREATE TABLE t (id INT)");
    let migrator = Migrator::new(db.clone(), source);
    let token = CancellationToken::new();
    token.cancel();

    let err = migrator.migrate(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(matches!(err.error, FlitError::Connection(DbError::Cancelled)));
    assert!(!db.relation_exists("t").unwrap());
}

#[tokio::test]
async fn test_glob_selects_subset() {
    let source = MemorySource::new()
        .with("001.sql", "CREATE TABLE a (id INT)")
        .with("seed/001.sql", "CREATE TABLE b (id INT)");
    let config = MigratorConfig::default().glob("seed/*.sql");
    let migrator = Migrator::with_config(duckdb(), source, config);

    let applied = migrator.migrate(&CancellationToken::new()).await.unwrap();
    assert_eq!(applied, vec!["seed/001.sql"]);
}

#[tokio::test]
async fn test_transactional_applies_and_records() {
    let db = duckdb();
    let source = MemorySource::new()
        .with("001.sql", "CREATE TABLE t (id INT)")
        .with("002.sql", "INSERT INTO t VALUES (1)");
    let config = MigratorConfig::default().transactional(true);
    let migrator = Migrator::with_config(db.clone(), source, config);

    let applied = migrator.migrate(&CancellationToken::new()).await.unwrap();
    assert_eq!(applied, vec!["001.sql", "002.sql"]);
    assert_eq!(db.query_count("SELECT * FROM flits").unwrap(), 2);
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 1);
}

#[tokio::test]
async fn test_transactional_failure_leaves_no_trace() {
    let db = duckdb();
    let source = MemorySource::new()
        .with("001.sql", "CREATE TABLE t (id INT)")
        .with("002.sql", "INSERT INTO missing_table VALUES (1)");
    let config = MigratorConfig::default().transactional(true);
    let migrator = Migrator::with_config(db.clone(), source, config);

    let err = migrator
        .migrate(&CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.applied, vec!["001.sql"]);
    assert_eq!(err.kind(), ErrorKind::Apply);
    assert_eq!(db.query_count("SELECT * FROM flits").unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_migrations_share_guard() {
    let db = duckdb();
    let mut source = MemorySource::new();
    source.insert("000.sql", "CREATE TABLE hits (id INT)");
    for i in 1..=10 {
        source.insert(format!("{i:03}.sql"), format!("INSERT INTO hits VALUES ({i})"));
    }

    let config = MigratorConfig::default();
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let migrator = Migrator::with_config(db.clone(), source.clone(), config.clone());
        tasks.push(tokio::spawn(async move {
            migrator.migrate(&CancellationToken::new()).await
        }));
    }

    let mut total = Vec::new();
    for task in tasks {
        total.extend(task.await.unwrap().unwrap());
    }

    total.sort();
    let expected: Vec<String> = (0..=10).map(|i| format!("{i:03}.sql")).collect();
    assert_eq!(total, expected);
    assert_eq!(db.query_count("SELECT * FROM flits").unwrap(), 11);
    assert_eq!(db.query_count("SELECT * FROM hits").unwrap(), 10);
}

#[tokio::test]
async fn test_default_configs_have_independent_guards() {
    let a = MigratorConfig::default();
    let b = MigratorConfig::default();
    assert!(!Arc::ptr_eq(&a.guard, &b.guard));

    let shared = a.clone();
    assert!(Arc::ptr_eq(&a.guard, &shared.guard));
}

#[test]
fn test_config_builder() {
    let config = MigratorConfig::default()
        .glob("nested/*.sql")
        .transactional(true)
        .guard(Arc::new(crate::guard::MySqlLockGuard::default()));
    assert_eq!(config.glob, "nested/*.sql");
    assert!(config.transactional);
    assert!(format!("{config:?}").contains("nested/*.sql"));
}
