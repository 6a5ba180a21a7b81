use playsona::db;
use playsona::db::migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
use rusqlite::Connection;

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = db::open_memory_database().unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert!(table_exists(&conn, "documents"));
    assert!(table_exists(&conn, "document_log"));
}

#[test]
fn migrations_are_idempotent() {
    let conn = db::open_memory_database().unwrap();
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn manual_v1_db_upgrades_correctly() {
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), 1);
    assert!(!table_exists(&conn, "document_log"));

    run_migrations(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), 2);
    assert!(table_exists(&conn, "document_log"));
}

#[test]
fn on_disk_database_reopens_at_current_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("playsona.db");

    drop(db::open_database(&path).unwrap());
    let conn = db::open_database(&path).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}
