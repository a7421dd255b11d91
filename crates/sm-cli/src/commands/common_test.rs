use super::*;
use crate::cli::{OutputFormat, StatusArgs, StripArgs, UpArgs};
use crate::commands::{status, strip, up};
use sm_db::{query_scalar_as, SqlQuery};
use tempfile::TempDir;

fn globals(dir: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: dir.display().to_string(),
        config: None,
        database: None,
        migrations_dir: None,
    }
}

/// A project with two migrations and the default configuration.
fn project_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let migrations = dir.path().join("migrations");
    std::fs::create_dir(&migrations).unwrap();
    std::fs::write(
        migrations.join("001_create.sql"),
        "CREATE TABLE notes (id INTEGER, body VARCHAR);\n",
    )
    .unwrap();
    std::fs::write(
        migrations.join("002_seed.sql"),
        "INSERT INTO notes VALUES (1, 'a');\nGO\nINSERT INTO notes VALUES (2, 'b');\n",
    )
    .unwrap();
    dir
}

fn status_of(global: &GlobalArgs) -> status::StatusReport {
    let args = StatusArgs {
        target: None,
        output: OutputFormat::Json,
    };
    status::build_report(&args, global).unwrap()
}

#[test]
fn test_load_project_applies_overrides() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("sqlmigrate.yml"),
        "database: app.duckdb\nbatch_delimiter: NEXT\n",
    )
    .unwrap();

    let mut global = globals(dir.path());
    global.migrations_dir = Some("sql".to_string());
    let project = load_project(&global).unwrap();
    assert_eq!(project.config.database, "app.duckdb");
    assert_eq!(project.config.migrations_dir, "sql");
    assert_eq!(project.config.batch_delimiter, "NEXT");

    global.database = Some(":memory:".to_string());
    assert_eq!(load_project(&global).unwrap().database_path(), ":memory:");
}

#[test]
fn test_load_project_rejects_bad_override() {
    let dir = tempfile::tempdir().unwrap();
    let mut global = globals(dir.path());
    global.database = Some("  ".to_string());
    assert!(load_project(&global).is_err());
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let mut global = globals(dir.path());
    global.config = Some(dir.path().join("other.yml").display().to_string());
    let err = load_project(&global).unwrap_err();
    assert!(err.to_string().contains("C001"), "{err}");
}

#[test]
fn test_up_then_status() {
    let dir = project_dir();
    let global = globals(dir.path());

    let before = status_of(&global);
    assert_eq!(before.current_version, 0);
    assert_eq!(before.target_version, Some(2));
    assert_eq!(before.pending, vec![1, 2]);

    up::execute(&UpArgs { target: None }, &global).unwrap();

    let after = status_of(&global);
    assert_eq!(after.current_version, 2);
    assert!(after.pending.is_empty());
    assert_eq!(after.interrupted, None);

    let project = load_project(&global).unwrap();
    let mut db = project.open_database(&project.store()).unwrap();
    let notes: i64 = query_scalar_as(&mut db, &SqlQuery::new("SELECT COUNT(*) FROM notes")).unwrap();
    assert_eq!(notes, 2);
}

#[test]
fn test_up_to_explicit_target() {
    let dir = project_dir();
    let global = globals(dir.path());

    up::execute(&UpArgs { target: Some(1) }, &global).unwrap();
    let report = status_of(&global);
    assert_eq!(report.current_version, 1);
    assert_eq!(report.pending, vec![2]);
}

#[test]
fn test_failed_up_exits_non_zero() {
    let dir = project_dir();
    std::fs::write(
        dir.path().join("migrations").join("003_broken.sql"),
        "INSERT INTO missing_table VALUES (1);\n",
    )
    .unwrap();
    let global = globals(dir.path());

    let err = up::execute(&UpArgs { target: None }, &global).unwrap_err();
    assert!(matches!(err.downcast_ref::<ExitCode>(), Some(ExitCode(1))));

    let report = status_of(&global);
    assert_eq!(report.current_version, 2);
    assert_eq!(report.pending, vec![3]);
}

#[test]
fn test_up_without_migrations_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let global = globals(dir.path());
    let err = up::execute(&UpArgs { target: None }, &global).unwrap_err();
    assert!(err.to_string().contains("SRC001"), "{err}");
}

#[test]
fn test_strip_renders_batches() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("script.sql");
    std::fs::write(&file, "-- header\nSELECT 1;\nGO\n/* two */ SELECT 2;\n").unwrap();
    let global = globals(dir.path());

    let whole = strip::render(
        &StripArgs {
            file: file.clone(),
            split: false,
        },
        &global,
    )
    .unwrap();
    assert_eq!(whole, vec!["\nSELECT 1;\nGO\n SELECT 2;\n"]);

    let batches = strip::render(&StripArgs { file, split: true }, &global).unwrap();
    assert_eq!(batches, vec!["-- batch 1\nSELECT 1;", "-- batch 2\nSELECT 2;"]);
}

#[test]
fn test_strip_reports_unterminated_comment() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.sql");
    std::fs::write(&file, "SELECT 1; /* never closed").unwrap();
    let err = strip::render(&StripArgs { file, split: false }, &globals(dir.path())).unwrap_err();
    assert!(format!("{err:#}").contains("Q001"), "{err:#}");
}
