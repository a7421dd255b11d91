//! End-to-end runs against in-memory and on-disk DuckDB databases.

use chrono::NaiveDateTime;
use sm_db::{query_scalar_as, Database, DuckDbDatabase, SqlQuery};
use sm_migrate::{
    BatchKind, DirectorySource, InMemorySource, MigrationRunner, RecordingObserver, RunPhase,
    RunStatus, RunnerConfig, TableVersionStore, VersionStore,
};

const GREETINGS: &str = "\
-- seed the greetings
INSERT INTO messages VALUES (1, 'hello');
GO
/* a second batch
   DROP TABLE messages; */
INSERT INTO messages VALUES (2, 'world');
GO
UPDATE messages SET text = upper(text) WHERE id > 0;
";

const BROKEN: &str = "\
INSERT INTO messages VALUES (3, 'lost');
GO
INSERT INTO missing_table VALUES (1);
";

/// A database at version 100 with one pre-existing message.
fn seeded_db(store: &TableVersionStore) -> DuckDbDatabase {
    let mut db = DuckDbDatabase::open_in_memory().unwrap();
    db.execute(&store.ensure_table_query()).unwrap();
    db.execute(&SqlQuery::new(
        "CREATE TABLE messages (id INTEGER, text VARCHAR);
         INSERT INTO messages VALUES (0, 'existing');
         INSERT INTO schema_migrations VALUES (100, TIMESTAMP '2024-01-01 00:00:00');",
    ))
    .unwrap();
    db
}

fn scalar_i64(db: &mut DuckDbDatabase, sql: &str) -> i64 {
    query_scalar_as(db, &SqlQuery::new(sql)).unwrap()
}

fn current_version(db: &mut DuckDbDatabase, store: &TableVersionStore) -> i64 {
    query_scalar_as(db, &store.current_version_query()).unwrap()
}

#[test]
fn test_migration_applies_batches_and_records_version() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);
    let source = InMemorySource::new().with_migration(101_i64, GREETINGS);
    let observer = RecordingObserver::new();

    let outcome = MigrationRunner::new(&mut db, &source, &store)
        .with_observer(&observer)
        .bring_to_version(101);

    assert_eq!(outcome.status(), RunStatus::Completed);
    assert_eq!(outcome.applied, vec![101]);
    assert_eq!(current_version(&mut db, &store), 101);
    assert_eq!(scalar_i64(&mut db, "SELECT COUNT(*) FROM messages"), 3);
    assert_eq!(
        scalar_i64(&mut db, "SELECT COUNT(*) FROM schema_migrations"),
        2
    );

    let applied_at: NaiveDateTime = query_scalar_as(
        &mut db,
        &SqlQuery::new("SELECT applied_at FROM schema_migrations WHERE version = 101"),
    )
    .unwrap();
    assert_eq!(Some(applied_at), store.last_applied_at());
}

#[test]
fn test_commented_statements_are_not_executed() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);
    let source = InMemorySource::new().with_migration(101_i64, GREETINGS);

    MigrationRunner::new(&mut db, &source, &store).bring_to_version(101);

    // The DROP inside the block comment never ran.
    assert_eq!(
        scalar_i64(&mut db, "SELECT COUNT(*) FROM messages WHERE text = 'WORLD'"),
        1
    );
}

#[test]
fn test_executed_batches_are_logged_in_order() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);
    let source = InMemorySource::new().with_migration(101_i64, GREETINGS);
    let observer = RecordingObserver::new();

    MigrationRunner::new(&mut db, &source, &store)
        .with_observer(&observer)
        .bring_to_version(101);

    let batches = observer.batches();
    let rows: Vec<_> = batches.iter().map(|b| b.rows_affected).collect();
    assert_eq!(rows, vec![1, 1, 2, 1]);

    assert_eq!(batches[0].sql, "INSERT INTO messages VALUES (1, 'hello');");
    assert!(!batches[1].sql.contains("DROP"));

    let update = &batches[3];
    assert_eq!(update.kind, BatchKind::VersionUpdate);
    assert_eq!(update.ordinal, 4);
    assert!(update
        .sql
        .starts_with("INSERT INTO \"schema_migrations\" (version, applied_at) VALUES (?, ?)"));
    assert!(update.sql.contains("\nPARAMETERS:\n   version: 101\n"));
}

#[test]
fn test_script_recording_its_own_version_is_overwritten() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);
    let source = InMemorySource::new().with_migration(
        101_i64,
        "INSERT INTO messages VALUES (1, 'hello');
GO
INSERT INTO schema_migrations VALUES (101, TIMESTAMP '2000-01-01 00:00:00');
",
    );
    let observer = RecordingObserver::new();

    let outcome = MigrationRunner::new(&mut db, &source, &store)
        .with_observer(&observer)
        .bring_to_version(101);

    assert_eq!(outcome.status(), RunStatus::Completed, "{:?}", observer.errors());
    assert_eq!(current_version(&mut db, &store), 101);
    assert_eq!(scalar_i64(&mut db, "SELECT COUNT(*) FROM messages"), 2);
    assert_eq!(
        scalar_i64(&mut db, "SELECT COUNT(*) FROM schema_migrations WHERE version = 101"),
        1
    );

    // The runner's write lands last.
    let applied_at: NaiveDateTime = query_scalar_as(
        &mut db,
        &SqlQuery::new("SELECT applied_at FROM schema_migrations WHERE version = 101"),
    )
    .unwrap();
    assert_eq!(Some(applied_at), store.last_applied_at());
}

#[test]
fn test_semicolon_inside_dollar_quoted_literal() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);
    let source = InMemorySource::new()
        .with_migration(101_i64, "INSERT INTO messages VALUES (1, $$a;b$$);");

    let outcome = MigrationRunner::new(&mut db, &source, &store).bring_to_version(101);

    assert!(outcome.is_success());
    assert_eq!(
        scalar_i64(&mut db, "SELECT COUNT(*) FROM messages WHERE text = 'a;b'"),
        1
    );
}

#[test]
fn test_failed_migration_rolls_back() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);
    let source = InMemorySource::new()
        .with_migration(101_i64, BROKEN)
        .with_migration(102_i64, "INSERT INTO messages VALUES (4, 'never');");
    let observer = RecordingObserver::new();

    let outcome = MigrationRunner::new(&mut db, &source, &store)
        .with_observer(&observer)
        .bring_to_version(102);

    assert_eq!(outcome.status(), RunStatus::Aborted);
    assert!(outcome.applied.is_empty());
    let failure = outcome.failure.as_ref().unwrap();
    assert_eq!(failure.version, Some(101));
    assert_eq!(failure.phase, RunPhase::ExecutingBatches);

    let error = observer.last_error().unwrap();
    assert!(error.contains("missing_table"), "{error}");

    // The first batch was undone, the pre-existing row kept, 102 never tried.
    assert_eq!(current_version(&mut db, &store), 100);
    assert_eq!(scalar_i64(&mut db, "SELECT COUNT(*) FROM messages"), 1);
    assert_eq!(
        scalar_i64(&mut db, "SELECT COUNT(*) FROM messages WHERE id = 0"),
        1
    );
    assert!(!observer
        .infos()
        .iter()
        .any(|m| m == "Starting migration 102"));
}

#[test]
fn test_later_run_resumes_after_fix() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);

    let broken = InMemorySource::new().with_migration(101_i64, BROKEN);
    MigrationRunner::new(&mut db, &broken, &store).bring_to_version(101);
    assert_eq!(current_version(&mut db, &store), 100);

    let fixed = InMemorySource::new().with_migration(101_i64, GREETINGS);
    let outcome = MigrationRunner::new(&mut db, &fixed, &store).bring_to_version(101);
    assert!(outcome.is_success());
    assert_eq!(current_version(&mut db, &store), 101);
}

#[test]
fn test_in_progress_marker_is_cleared() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);
    let source = InMemorySource::new()
        .with_migration(101_i64, GREETINGS)
        .with_migration(102_i64, BROKEN);
    let config = RunnerConfig::default().with_in_progress_marker(true);

    let outcome = MigrationRunner::new(&mut db, &source, &store)
        .with_config(config)
        .bring_to_version(102);

    assert_eq!(outcome.applied, vec![101]);
    assert_eq!(current_version(&mut db, &store), 101);
    let marked: Option<i64> = query_scalar_as(&mut db, &store.in_progress_query()).unwrap();
    assert_eq!(marked, None);
}

#[test]
fn test_in_progress_marker_survives_interrupted_run() {
    let store = TableVersionStore::default();
    let mut db = seeded_db(&store);

    // A run that died between marking and committing leaves only the marker.
    db.execute(&store.mark_in_progress_query(&101).unwrap())
        .unwrap();

    let marked: Option<i64> = query_scalar_as(&mut db, &store.in_progress_query()).unwrap();
    assert_eq!(marked, Some(101));
    assert_eq!(current_version(&mut db, &store), 100);
}

#[test]
fn test_directory_source_against_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let migrations = dir.path().join("migrations");
    std::fs::create_dir(&migrations).unwrap();
    std::fs::write(
        migrations.join("0001_create.sql"),
        "CREATE TABLE notes (id INTEGER, body VARCHAR);\nGO\n",
    )
    .unwrap();
    std::fs::write(
        migrations.join("0002_seed.sql"),
        "-- first note\nINSERT INTO notes VALUES (1, 'a');\n",
    )
    .unwrap();
    std::fs::write(migrations.join("README.md"), "not a migration").unwrap();

    let path = dir.path().join("app.duckdb");
    let store = TableVersionStore::default();
    {
        let mut db = DuckDbDatabase::open_path(&path).unwrap();
        db.execute(&store.ensure_table_query()).unwrap();
        db.close().unwrap();
    }

    let source = DirectorySource::new(&migrations);
    let mut db = DuckDbDatabase::new(&path.display().to_string());
    let outcome = MigrationRunner::new(&mut db, &source, &store).bring_to_version(2);
    assert_eq!(outcome.applied, vec![1, 2]);
    assert!(!db.is_open());

    db.open().unwrap();
    assert_eq!(current_version(&mut db, &store), 2);
    assert_eq!(scalar_i64(&mut db, "SELECT COUNT(*) FROM notes"), 1);
}
