//! Schema Parity Tests
//!
//! Verifies that the catalog schema created by `init_schema` matches the
//! Diesel table definitions: every persisted field, its nullability, the
//! natural-key constraints and the foreign keys.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{Connection, Result as SqliteResult};
use tempfile::tempdir;
use timetable_sync::repository::CatalogContext;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnInfo {
    col_type: String,
    not_null: bool,
    primary_key: bool,
}

/// Extract the columns of one table.
fn extract_columns(conn: &Connection, table: &str) -> SqliteResult<BTreeMap<String, ColumnInfo>> {
    let mut pragma = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let rows = pragma.query_map([], |row| {
        Ok((
            row.get::<_, String>(1)?,
            ColumnInfo {
                col_type: row.get::<_, String>(2)?.to_uppercase(),
                not_null: row.get(3)?,
                primary_key: row.get::<_, i32>(5)? > 0,
            },
        ))
    })?;
    rows.collect()
}

/// Column sets of every UNIQUE constraint on a table.
fn extract_unique_constraints(
    conn: &Connection,
    table: &str,
) -> SqliteResult<BTreeSet<Vec<String>>> {
    let mut list = conn.prepare(&format!("PRAGMA index_list(\"{}\")", table))?;
    let indexes: Vec<(String, bool, String)> = list
        .query_map([], |row| Ok((row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<SqliteResult<Vec<_>>>()?;

    let mut constraints = BTreeSet::new();
    for (name, unique, origin) in indexes {
        if !unique || origin != "u" {
            continue;
        }
        let mut info = conn.prepare(&format!("PRAGMA index_info(\"{}\")", name))?;
        let columns: Vec<String> = info
            .query_map([], |row| row.get(2))?
            .collect::<SqliteResult<Vec<_>>>()?;
        constraints.insert(columns);
    }
    Ok(constraints)
}

/// (column, referenced table) pairs for a table's foreign keys.
fn extract_foreign_keys(conn: &Connection, table: &str) -> SqliteResult<BTreeSet<(String, String)>> {
    let mut pragma = conn.prepare(&format!("PRAGMA foreign_key_list(\"{}\")", table))?;
    let keys = pragma
        .query_map([], |row| Ok((row.get::<_, String>(3)?, row.get::<_, String>(2)?)))?
        .collect::<SqliteResult<BTreeSet<_>>>()?;
    Ok(keys)
}

fn column(col_type: &str, not_null: bool) -> ColumnInfo {
    ColumnInfo {
        col_type: col_type.to_string(),
        not_null,
        primary_key: false,
    }
}

fn primary(col_type: &str) -> ColumnInfo {
    ColumnInfo {
        col_type: col_type.to_string(),
        not_null: false,
        primary_key: true,
    }
}

async fn initialized_catalog() -> (Connection, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");

    let ctx = CatalogContext::new(&db_path);
    ctx.init_schema().await.unwrap();
    // Running it again must be harmless
    ctx.init_schema().await.unwrap();

    (Connection::open(&db_path).unwrap(), dir)
}

#[tokio::test]
async fn test_tables_present() {
    let (conn, _dir) = initialized_catalog().await;

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master WHERE type='table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .unwrap();
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<SqliteResult<Vec<_>>>()
        .unwrap();

    assert_eq!(
        tables,
        vec![
            "file_versions",
            "resource_tags",
            "resources",
            "settings",
            "storage_locations",
            "tags",
        ]
    );
}

#[tokio::test]
async fn test_resource_fields() {
    let (conn, _dir) = initialized_catalog().await;

    let expected: BTreeMap<String, ColumnInfo> = [
        ("id", primary("INTEGER")),
        ("name", column("TEXT", true)),
        ("path", column("TEXT", true)),
        ("metadata", column("TEXT", false)),
        ("deprecated", column("BOOLEAN", true)),
        ("last_update", column("TEXT", true)),
    ]
    .into_iter()
    .map(|(name, info)| (name.to_string(), info))
    .collect();

    assert_eq!(extract_columns(&conn, "resources").unwrap(), expected);
    assert_eq!(
        extract_unique_constraints(&conn, "resources").unwrap(),
        BTreeSet::from([vec!["path".to_string(), "name".to_string()]])
    );
}

#[tokio::test]
async fn test_file_version_fields() {
    let (conn, _dir) = initialized_catalog().await;

    let expected: BTreeMap<String, ColumnInfo> = [
        ("id", primary("INTEGER")),
        ("resource_id", column("INTEGER", true)),
        ("mimetype", column("TEXT", false)),
        ("url", column("TEXT", false)),
        ("timestamp", column("TEXT", true)),
        ("last_changed", column("TEXT", false)),
        ("hashsum", column("TEXT", true)),
    ]
    .into_iter()
    .map(|(name, info)| (name.to_string(), info))
    .collect();

    assert_eq!(extract_columns(&conn, "file_versions").unwrap(), expected);
    assert_eq!(
        extract_foreign_keys(&conn, "file_versions").unwrap(),
        BTreeSet::from([("resource_id".to_string(), "resources".to_string())])
    );
}

#[tokio::test]
async fn test_tag_fields_and_association() {
    let (conn, _dir) = initialized_catalog().await;

    let tags = extract_columns(&conn, "tags").unwrap();
    assert_eq!(
        tags.keys().cloned().collect::<Vec<_>>(),
        vec!["category", "id", "name"]
    );
    assert_eq!(
        extract_unique_constraints(&conn, "tags").unwrap(),
        BTreeSet::from([vec!["name".to_string(), "category".to_string()]])
    );

    let association = extract_columns(&conn, "resource_tags").unwrap();
    assert!(association.values().all(|c| c.primary_key && c.not_null));
    assert_eq!(
        extract_foreign_keys(&conn, "resource_tags").unwrap(),
        BTreeSet::from([
            ("resource_id".to_string(), "resources".to_string()),
            ("tag_id".to_string(), "tags".to_string()),
        ])
    );
}

#[tokio::test]
async fn test_storage_location_fields() {
    let (conn, _dir) = initialized_catalog().await;

    let columns = extract_columns(&conn, "storage_locations").unwrap();
    assert_eq!(
        columns.keys().cloned().collect::<Vec<_>>(),
        vec!["backend", "id", "locator", "version_id"]
    );
    assert_eq!(
        extract_foreign_keys(&conn, "storage_locations").unwrap(),
        BTreeSet::from([("version_id".to_string(), "file_versions".to_string())])
    );

    let settings = extract_columns(&conn, "settings").unwrap();
    assert!(settings["key"].primary_key);
    assert!(settings["value"].not_null);
}
