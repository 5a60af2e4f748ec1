//! Diesel ORM models for catalog tables.
//!
//! Timestamps are stored as RFC 3339 text and metadata as JSON text; the
//! repositories convert to domain models.

use diesel::prelude::*;

use crate::schema;

/// Resource record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::resources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ResourceRecord {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub metadata: Option<String>,
    pub deprecated: bool,
    pub last_update: String,
}

/// New resource for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::resources)]
pub struct NewResource<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub metadata: Option<&'a str>,
    pub deprecated: bool,
    pub last_update: &'a str,
}

/// File version record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::file_versions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FileVersionRecord {
    pub id: i32,
    pub resource_id: i32,
    pub mimetype: Option<String>,
    pub url: Option<String>,
    pub timestamp: String,
    pub last_changed: Option<String>,
    pub hashsum: String,
}

/// New file version for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::file_versions)]
pub struct NewFileVersion<'a> {
    pub resource_id: i32,
    pub mimetype: Option<&'a str>,
    pub url: Option<&'a str>,
    pub timestamp: &'a str,
    pub last_changed: Option<&'a str>,
    pub hashsum: &'a str,
}

/// Tag record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TagRecord {
    pub id: i32,
    pub name: String,
    pub category: String,
}

/// New tag for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::tags)]
pub struct NewTag<'a> {
    pub name: &'a str,
    pub category: &'a str,
}

/// Resource/tag link for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::resource_tags)]
pub struct NewResourceTag {
    pub resource_id: i32,
    pub tag_id: i32,
}

/// Storage location record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::storage_locations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StorageLocationRecord {
    pub id: i32,
    pub version_id: i32,
    pub backend: String,
    pub locator: String,
}

/// New storage location for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::storage_locations)]
pub struct NewStorageLocation<'a> {
    pub version_id: i32,
    pub backend: &'a str,
    pub locator: &'a str,
}

/// Setting record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SettingRecord {
    pub key: String,
    pub value: String,
}

#[derive(QueryableByName)]
pub(crate) struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::Integer, column_name = "last_insert_rowid()")]
    pub id: i32,
}
