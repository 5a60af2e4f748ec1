//! Catalog repository: resources, their versions, tags and stored copies.
//!
//! All state changes for one crawled file go through [`CatalogRepository::reconcile`],
//! which applies a [`ResourcePlan`] and optionally appends a version inside a
//! single transaction.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{
    FileVersionRecord, LastInsertRowId, NewFileVersion, NewResource, NewResourceTag,
    NewStorageLocation, NewTag, ResourceRecord, TagRecord,
};
use super::pool::{DbError, DbPool, SqliteConn};
use super::util::{format_datetime, parse_datetime, parse_datetime_opt};
use crate::models::{
    FileVersion, NewVersion, Resource, ResourceIdentity, ResourcePlan, StorageLocation, Tag,
};
use crate::schema::{file_versions, resource_tags, resources, storage_locations, tags};

impl From<FileVersionRecord> for FileVersion {
    fn from(record: FileVersionRecord) -> Self {
        FileVersion {
            id: record.id,
            resource_id: record.resource_id,
            mimetype: record.mimetype,
            url: record.url,
            timestamp: parse_datetime(&record.timestamp),
            last_changed: parse_datetime_opt(record.last_changed),
            hashsum: record.hashsum,
        }
    }
}

impl From<TagRecord> for Tag {
    fn from(record: TagRecord) -> Self {
        Tag {
            name: record.name,
            category: record.category,
        }
    }
}

fn resource_from_record(record: ResourceRecord, tags: Vec<Tag>) -> Resource {
    Resource {
        id: record.id,
        name: record.name,
        path: record.path,
        metadata: record
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok()),
        deprecated: record.deprecated,
        last_update: parse_datetime(&record.last_update),
        tags,
    }
}

/// A fingerprinted version offered to [`CatalogRepository::reconcile`] together
/// with the locations every storage backend confirmed.
#[derive(Debug, Clone, Copy)]
pub struct VersionCandidate<'a> {
    pub version: &'a NewVersion,
    pub locations: &'a [StorageLocation],
}

/// What happened to the offered version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOutcome {
    /// A new version row was written.
    Appended(i32),
    /// The latest version already has this fingerprint.
    Unchanged,
    /// No version was offered (storage failed or the caller only refreshed
    /// the resource).
    NotOffered,
}

/// Result of reconciling one resource plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub resource_id: i32,
    pub created: bool,
    /// The resource was deprecated before this reconcile.
    pub revived: bool,
    pub outcome: VersionOutcome,
}

/// Diesel-based catalog repository.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: DbPool,
}

impl CatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Look up a resource by its canonical identity.
    pub async fn find_resource(
        &self,
        identity: &ResourceIdentity,
    ) -> Result<Option<Resource>, DbError> {
        let mut conn = self.pool.get().await?;

        let Some(record) = find_resource_record(&mut conn, identity).await? else {
            return Ok(None);
        };
        let tags = load_tags(&mut conn, record.id).await?;
        Ok(Some(resource_from_record(record, tags)))
    }

    /// Most recent version of a resource by discovery time.
    pub async fn latest_version(&self, resource_id: i32) -> Result<Option<FileVersion>, DbError> {
        let mut conn = self.pool.get().await?;
        latest_version_record(&mut conn, resource_id)
            .await
            .map(|opt| opt.map(FileVersion::from))
    }

    /// Fingerprint of the latest version stored under an identity, if any.
    pub async fn latest_hashsum(
        &self,
        identity: &ResourceIdentity,
    ) -> Result<Option<String>, DbError> {
        let mut conn = self.pool.get().await?;

        let Some(record) = find_resource_record(&mut conn, identity).await? else {
            return Ok(None);
        };
        latest_version_record(&mut conn, record.id)
            .await
            .map(|opt| opt.map(|version| version.hashsum))
    }

    /// Apply a resource plan and optionally append a version, atomically.
    ///
    /// The resource is created if unseen, otherwise its metadata is refreshed;
    /// either way it ends up non-deprecated with exactly the plan's tags. The
    /// candidate version is appended only when its fingerprint differs from
    /// the latest stored one, re-checked inside the transaction.
    pub async fn reconcile(
        &self,
        plan: &ResourcePlan,
        candidate: Option<VersionCandidate<'_>>,
    ) -> Result<Reconciled, DbError> {
        let mut conn = self.pool.get().await?;

        conn.transaction(|conn| {
            Box::pin(async move {
                let now = format_datetime(Utc::now());
                let metadata = plan.metadata.as_ref().map(|m| m.to_string());

                let (resource_id, created, revived) =
                    match find_resource_record(conn, &plan.identity).await? {
                        Some(record) => {
                            diesel::update(resources::table.find(record.id))
                                .set((
                                    resources::deprecated.eq(false),
                                    resources::metadata.eq(metadata.as_deref()),
                                ))
                                .execute(conn)
                                .await?;
                            if record.deprecated {
                                diesel::update(resources::table.find(record.id))
                                    .set(resources::last_update.eq(&now))
                                    .execute(conn)
                                    .await?;
                            }
                            (record.id, false, record.deprecated)
                        }
                        None => {
                            diesel::insert_into(resources::table)
                                .values(NewResource {
                                    name: &plan.identity.name,
                                    path: &plan.identity.path,
                                    metadata: metadata.as_deref(),
                                    deprecated: false,
                                    last_update: &now,
                                })
                                .execute(conn)
                                .await?;
                            let row: LastInsertRowId =
                                diesel::sql_query("SELECT last_insert_rowid()")
                                    .get_result(conn)
                                    .await?;
                            (row.id, true, false)
                        }
                    };

                replace_tags(conn, resource_id, &plan.tags).await?;

                let outcome = match candidate {
                    None => VersionOutcome::NotOffered,
                    Some(candidate) => {
                        let latest = latest_version_record(conn, resource_id).await?;
                        if latest.map(|v| v.hashsum).as_deref()
                            == Some(candidate.version.hashsum.as_str())
                        {
                            VersionOutcome::Unchanged
                        } else {
                            let version_id =
                                append_version(conn, resource_id, candidate).await?;
                            diesel::update(resources::table.find(resource_id))
                                .set(resources::last_update.eq(&now))
                                .execute(conn)
                                .await?;
                            VersionOutcome::Appended(version_id)
                        }
                    }
                };

                Ok(Reconciled {
                    resource_id,
                    created,
                    revived,
                    outcome,
                })
            })
        })
        .await
    }

    /// Deprecate every active resource not in `touched`.
    ///
    /// Returns the number of resources flipped. An empty `touched` set is a
    /// no-op: a pass that processed nothing must not tombstone the catalog.
    pub async fn sweep(&self, touched: &HashSet<i32>) -> Result<usize, DbError> {
        if touched.is_empty() {
            tracing::debug!("Sweep skipped: no resources touched");
            return Ok(0);
        }

        let mut conn = self.pool.get().await?;
        let ids: Vec<i32> = touched.iter().copied().collect();
        let now = format_datetime(Utc::now());

        diesel::update(
            resources::table
                .filter(resources::deprecated.eq(false))
                .filter(resources::id.ne_all(ids)),
        )
        .set((
            resources::deprecated.eq(true),
            resources::last_update.eq(&now),
        ))
        .execute(&mut conn)
        .await
    }

    /// All resources with their tags, ordered by path and name.
    pub async fn list_resources(&self, include_deprecated: bool) -> Result<Vec<Resource>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut query = resources::table
            .select(ResourceRecord::as_select())
            .order((resources::path.asc(), resources::name.asc()))
            .into_boxed();
        if !include_deprecated {
            query = query.filter(resources::deprecated.eq(false));
        }
        let records: Vec<ResourceRecord> = query.load(&mut conn).await?;

        let links: Vec<(i32, TagRecord)> = resource_tags::table
            .inner_join(tags::table)
            .select((resource_tags::resource_id, TagRecord::as_select()))
            .order((tags::category.asc(), tags::name.asc()))
            .load(&mut conn)
            .await?;
        let mut tags_by_resource: HashMap<i32, Vec<Tag>> = HashMap::new();
        for (resource_id, tag) in links {
            tags_by_resource
                .entry(resource_id)
                .or_default()
                .push(Tag::from(tag));
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let tags = tags_by_resource.remove(&record.id).unwrap_or_default();
                resource_from_record(record, tags)
            })
            .collect())
    }

    /// Versions of a resource, newest first.
    pub async fn versions(&self, resource_id: i32) -> Result<Vec<FileVersion>, DbError> {
        let mut conn = self.pool.get().await?;

        file_versions::table
            .filter(file_versions::resource_id.eq(resource_id))
            .order((file_versions::timestamp.desc(), file_versions::id.desc()))
            .select(FileVersionRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(FileVersion::from).collect())
    }

    /// Tags currently attached to a resource.
    pub async fn resource_tags(&self, resource_id: i32) -> Result<Vec<Tag>, DbError> {
        let mut conn = self.pool.get().await?;
        load_tags(&mut conn, resource_id).await
    }

    /// Versions of a resource stored by `backend`, with their locators,
    /// ordered by site-reported change time (newest first).
    pub async fn version_locations(
        &self,
        resource_id: i32,
        backend: &str,
    ) -> Result<Vec<(FileVersion, String)>, DbError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(FileVersionRecord, String)> = storage_locations::table
            .inner_join(file_versions::table)
            .filter(file_versions::resource_id.eq(resource_id))
            .filter(storage_locations::backend.eq(backend))
            .order((
                file_versions::last_changed.desc(),
                file_versions::timestamp.desc(),
            ))
            .select((FileVersionRecord::as_select(), storage_locations::locator))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(record, locator)| (FileVersion::from(record), locator))
            .collect())
    }
}

async fn find_resource_record(
    conn: &mut SqliteConn,
    identity: &ResourceIdentity,
) -> Result<Option<ResourceRecord>, DbError> {
    resources::table
        .filter(resources::path.eq(&identity.path))
        .filter(resources::name.eq(&identity.name))
        .select(ResourceRecord::as_select())
        .first(conn)
        .await
        .optional()
}

async fn latest_version_record(
    conn: &mut SqliteConn,
    resource_id: i32,
) -> Result<Option<FileVersionRecord>, DbError> {
    file_versions::table
        .filter(file_versions::resource_id.eq(resource_id))
        .order((file_versions::timestamp.desc(), file_versions::id.desc()))
        .select(FileVersionRecord::as_select())
        .first(conn)
        .await
        .optional()
}

async fn load_tags(conn: &mut SqliteConn, resource_id: i32) -> Result<Vec<Tag>, DbError> {
    resource_tags::table
        .inner_join(tags::table)
        .filter(resource_tags::resource_id.eq(resource_id))
        .order((tags::category.asc(), tags::name.asc()))
        .select(TagRecord::as_select())
        .load(conn)
        .await
        .map(|records| records.into_iter().map(Tag::from).collect())
}

/// Replace the tag set of a resource, creating missing tags.
async fn replace_tags(
    conn: &mut SqliteConn,
    resource_id: i32,
    new_tags: &[Tag],
) -> Result<(), DbError> {
    diesel::delete(resource_tags::table.filter(resource_tags::resource_id.eq(resource_id)))
        .execute(conn)
        .await?;

    for tag in new_tags {
        diesel::insert_or_ignore_into(tags::table)
            .values(NewTag {
                name: &tag.name,
                category: &tag.category,
            })
            .execute(conn)
            .await?;

        let tag_id: i32 = tags::table
            .filter(tags::name.eq(&tag.name))
            .filter(tags::category.eq(&tag.category))
            .select(tags::id)
            .first(conn)
            .await?;

        diesel::insert_or_ignore_into(resource_tags::table)
            .values(NewResourceTag {
                resource_id,
                tag_id,
            })
            .execute(conn)
            .await?;
    }

    Ok(())
}

async fn append_version(
    conn: &mut SqliteConn,
    resource_id: i32,
    candidate: VersionCandidate<'_>,
) -> Result<i32, DbError> {
    let version = candidate.version;
    let timestamp = format_datetime(version.timestamp);
    let last_changed = format_datetime(version.last_changed);

    diesel::insert_into(file_versions::table)
        .values(NewFileVersion {
            resource_id,
            mimetype: (!version.mimetype.is_empty()).then_some(version.mimetype.as_str()),
            url: Some(&version.url),
            timestamp: &timestamp,
            last_changed: Some(&last_changed),
            hashsum: &version.hashsum,
        })
        .execute(conn)
        .await?;
    let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
        .get_result(conn)
        .await?;

    for location in candidate.locations {
        diesel::insert_into(storage_locations::table)
            .values(NewStorageLocation {
                version_id: row.id,
                backend: &location.backend,
                locator: &location.locator,
            })
            .execute(conn)
            .await?;
    }

    Ok(row.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagCategory;
    use crate::repository::CatalogContext;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn setup_test_db() -> (CatalogRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = CatalogContext::new(&dir.path().join("catalog.db"));
        ctx.init_schema().await.unwrap();
        (ctx.catalog(), dir)
    }

    fn plan(path: &str, name: &str, course: &str) -> ResourcePlan {
        ResourcePlan::builder(ResourceIdentity::new(path, name))
            .metadata(serde_json::json!({ "course": [course] }))
            .tag(Tag::new("Занятия", TagCategory::ScheduleKind))
            .tag(Tag::new(course, TagCategory::Course))
            .build()
    }

    fn version(hashsum: &str, minutes: i64) -> NewVersion {
        let base = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
        NewVersion {
            mimetype: "xlsx".into(),
            url: "https://example.org/file.xlsx".into(),
            timestamp: base + Duration::minutes(minutes),
            last_changed: base + Duration::minutes(minutes),
            hashsum: hashsum.into(),
            short_name: "F.xlsx".into(),
        }
    }

    fn local(locator: &str) -> Vec<StorageLocation> {
        vec![StorageLocation {
            backend: "local".into(),
            locator: locator.into(),
        }]
    }

    #[tokio::test]
    async fn test_reconcile_creates_and_appends() {
        let (catalog, _dir) = setup_test_db().await;
        let plan = plan("РЗ/Б/К1", "Расписание", "1");
        let v1 = version("aaa", 0);
        let locations = local("/store/a");

        let result = catalog
            .reconcile(
                &plan,
                Some(VersionCandidate {
                    version: &v1,
                    locations: &locations,
                }),
            )
            .await
            .unwrap();

        assert!(result.created);
        assert!(matches!(result.outcome, VersionOutcome::Appended(_)));

        let resource = catalog.find_resource(&plan.identity).await.unwrap().unwrap();
        assert_eq!(resource.id, result.resource_id);
        assert!(!resource.deprecated);
        assert_eq!(resource.tags.len(), 2);
        assert_eq!(resource.metadata.unwrap()["course"][0], "1");

        let latest = catalog.latest_version(resource.id).await.unwrap().unwrap();
        assert_eq!(latest.hashsum, "aaa");
        assert_eq!(latest.mimetype.as_deref(), Some("xlsx"));
        assert_eq!(
            catalog.latest_hashsum(&plan.identity).await.unwrap().as_deref(),
            Some("aaa")
        );
    }

    #[tokio::test]
    async fn test_reconcile_gates_on_fingerprint() {
        let (catalog, _dir) = setup_test_db().await;
        let plan = plan("РЗ/Б/К1", "Расписание", "1");
        let locations = local("/store/a");

        for (hash, minutes, expect_append) in
            [("aaa", 0, true), ("aaa", 10, false), ("bbb", 20, true), ("bbb", 30, false)]
        {
            let v = version(hash, minutes);
            let result = catalog
                .reconcile(
                    &plan,
                    Some(VersionCandidate {
                        version: &v,
                        locations: &locations,
                    }),
                )
                .await
                .unwrap();
            assert_eq!(
                matches!(result.outcome, VersionOutcome::Appended(_)),
                expect_append,
                "hash {} at +{}",
                hash,
                minutes
            );
        }

        let resource = catalog.find_resource(&plan.identity).await.unwrap().unwrap();
        let versions = catalog.versions(resource.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].hashsum, "bbb");
        assert_eq!(versions[1].hashsum, "aaa");
    }

    #[tokio::test]
    async fn test_reconcile_without_candidate_touches_only() {
        let (catalog, _dir) = setup_test_db().await;
        let plan = plan("РЗ/Б/К1", "Расписание", "1");

        let result = catalog.reconcile(&plan, None).await.unwrap();
        assert!(result.created);
        assert_eq!(result.outcome, VersionOutcome::NotOffered);
        assert!(catalog.versions(result.resource_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tags_are_replaced_and_shared() {
        let (catalog, _dir) = setup_test_db().await;

        let first = catalog
            .reconcile(&plan("РЗ/К1", "Первый", "1"), None)
            .await
            .unwrap();
        catalog
            .reconcile(&plan("РЗ/К2", "Второй", "1"), None)
            .await
            .unwrap();
        // Course changes for the first resource
        catalog
            .reconcile(&plan("РЗ/К1", "Первый", "3"), None)
            .await
            .unwrap();

        let tags = catalog.resource_tags(first.resource_id).await.unwrap();
        let courses: Vec<&str> = tags
            .iter()
            .filter(|t| t.category == "course")
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(courses, vec!["3"]);

        // The schedule-kind tag exists once and is linked to both resources
        let resources = catalog.list_resources(false).await.unwrap();
        assert_eq!(resources.len(), 2);
        assert!(resources
            .iter()
            .all(|r| r.tags.iter().any(|t| t.name == "Занятия")));
    }

    #[tokio::test]
    async fn test_sweep_deprecates_untouched_and_is_idempotent() {
        let (catalog, _dir) = setup_test_db().await;
        let kept = catalog
            .reconcile(&plan("РЗ/К1", "Первый", "1"), None)
            .await
            .unwrap();
        let gone = catalog
            .reconcile(&plan("РЗ/К2", "Второй", "2"), None)
            .await
            .unwrap();

        let touched: HashSet<i32> = [kept.resource_id].into_iter().collect();
        assert_eq!(catalog.sweep(&touched).await.unwrap(), 1);
        assert_eq!(catalog.sweep(&touched).await.unwrap(), 0);

        let active = catalog.list_resources(false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.resource_id);

        let all = catalog.list_resources(true).await.unwrap();
        let tombstone = all.iter().find(|r| r.id == gone.resource_id).unwrap();
        assert!(tombstone.deprecated);

        // Empty touched set never deprecates anything
        assert_eq!(catalog.sweep(&HashSet::new()).await.unwrap(), 0);
        assert_eq!(catalog.list_resources(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_revives_deprecated() {
        let (catalog, _dir) = setup_test_db().await;
        let kept = catalog
            .reconcile(&plan("РЗ/К1", "Первый", "1"), None)
            .await
            .unwrap();
        let revived = plan("РЗ/К2", "Второй", "2");
        catalog.reconcile(&revived, None).await.unwrap();
        catalog
            .sweep(&[kept.resource_id].into_iter().collect())
            .await
            .unwrap();

        let result = catalog.reconcile(&revived, None).await.unwrap();
        assert!(!result.created);
        assert!(result.revived);
        let resource = catalog
            .find_resource(&revived.identity)
            .await
            .unwrap()
            .unwrap();
        assert!(!resource.deprecated);
    }

    #[tokio::test]
    async fn test_version_locations_ordered_by_last_changed() {
        let (catalog, _dir) = setup_test_db().await;
        let plan = plan("РЗ/К1", "Первый", "1");

        for (hash, minutes) in [("a", 0), ("b", 10), ("c", 20)] {
            let v = version(hash, minutes);
            let locations = local(&format!("/store/{}", hash));
            catalog
                .reconcile(
                    &plan,
                    Some(VersionCandidate {
                        version: &v,
                        locations: &locations,
                    }),
                )
                .await
                .unwrap();
        }

        let resource = catalog.find_resource(&plan.identity).await.unwrap().unwrap();
        let stored = catalog.version_locations(resource.id, "local").await.unwrap();
        let locators: Vec<&str> = stored.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(locators, vec!["/store/c", "/store/b", "/store/a"]);
        assert!(catalog
            .version_locations(resource.id, "remote")
            .await
            .unwrap()
            .is_empty());
    }
}
