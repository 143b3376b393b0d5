use minderbot_core::db::migrations::{apply_migrations, latest_version};
use minderbot_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "suggestions");
    assert_table_exists(&conn, "suggestion_tags");
    assert_table_exists(&conn, "tags");
    assert_table_exists(&conn, "tag_suggestions");
    assert_table_exists(&conn, "feedback");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minderbot.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "tags");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn version_one_file_is_upgraded_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
        .unwrap();
    conn.execute_batch(
        "PRAGMA user_version = 1;
         INSERT INTO users (id, email, is_staff) VALUES ('joe', 'joe@example.com', 0);",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "feedback");
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 1);
}

#[test]
fn failed_upgrade_keeps_previous_version() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
        .unwrap();
    conn.execute_batch("PRAGMA user_version = 1; CREATE TABLE feedback (id TEXT);")
        .unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert!(
        matches!(err, DbError::Migration { version: 2, name: "feedback", .. }),
        "unexpected error: {err}"
    );
    assert_eq!(schema_version(&conn), 1);
}

#[test]
fn reference_tables_accept_dangling_ids() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO tags (id, count, created) VALUES ('a', 1, NULL);
         INSERT INTO tag_suggestions (tag_id, position, suggestion_id) VALUES ('a', 0, 'ghost');",
    )
    .unwrap();

    let dangling: String = conn
        .query_row(
            "SELECT suggestion_id FROM tag_suggestions WHERE tag_id = 'a';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dangling, "ghost");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
