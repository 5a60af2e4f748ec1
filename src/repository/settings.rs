//! Key/value settings stored in the catalog database.
//!
//! The pipeline only reads these; `ttsync settings set` writes them.

use std::time::Duration;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::SettingRecord;
use super::pool::{DbError, DbPool};
use crate::schema::settings;

/// Update interval in minutes.
pub const TIME_UPDATE: &str = "time_update";
/// `;`-separated crawl root URLs, paired positionally with schedule kinds.
pub const ANALYZE_URL: &str = "analyze_url";
/// `;`-separated storage backend names to enable.
pub const DOWNLOAD_STORAGE: &str = "download_storage";

/// Keys accepted by `settings set`.
pub const AVAILABLE_KEYS: &[&str] = &[TIME_UPDATE, ANALYZE_URL, DOWNLOAD_STORAGE];

pub const DEFAULT_UPDATE_MINUTES: u64 = 180;
/// Longest accepted update interval: one week.
pub const MAX_UPDATE_MINUTES: u64 = 7 * 24 * 60;
pub const DEFAULT_CRAWL_ROOT: &str = "https://www.vstu.ru/student/raspisaniya/zanyatiy/";

/// A valid update interval: a whole number of minutes in
/// `1..=MAX_UPDATE_MINUTES`.
pub fn valid_update_minutes(value: &str) -> Option<u64> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|minutes| (1..=MAX_UPDATE_MINUTES).contains(minutes))
}

/// Parse the update interval, falling back to the default when unset,
/// unparseable or out of range.
pub fn parse_update_minutes(value: Option<&str>) -> u64 {
    value
        .and_then(valid_update_minutes)
        .unwrap_or(DEFAULT_UPDATE_MINUTES)
}

/// Wall-clock length of an update interval.
pub fn update_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.min(MAX_UPDATE_MINUTES) * 60)
}

/// Split a `;`-separated list, dropping blanks.
pub fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(';')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Crawl roots, falling back to the single default root.
pub fn parse_crawl_roots(value: Option<&str>) -> Vec<String> {
    let roots = parse_list(value);
    if roots.is_empty() {
        vec![DEFAULT_CRAWL_ROOT.to_string()]
    } else {
        roots
    }
}

/// Diesel-based settings repository.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: DbPool,
}

impl SettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a setting value.
    pub async fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        let mut conn = self.pool.get().await?;

        settings::table
            .find(key)
            .select(settings::value)
            .first::<String>(&mut conn)
            .await
            .optional()
    }

    /// Set a setting value (insert or replace).
    pub async fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::replace_into(settings::table)
            .values((settings::key.eq(key), settings::value.eq(value)))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// All settings, ordered by key.
    pub async fn list(&self) -> Result<Vec<(String, String)>, DbError> {
        let mut conn = self.pool.get().await?;

        settings::table
            .order(settings::key.asc())
            .select(SettingRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(|r| (r.key, r.value)).collect())
    }

    pub async fn update_minutes(&self) -> Result<u64, DbError> {
        Ok(parse_update_minutes(self.get(TIME_UPDATE).await?.as_deref()))
    }

    pub async fn crawl_roots(&self) -> Result<Vec<String>, DbError> {
        Ok(parse_crawl_roots(self.get(ANALYZE_URL).await?.as_deref()))
    }

    /// Enabled storage backend names; empty means every configured backend.
    pub async fn enabled_backends(&self) -> Result<Vec<String>, DbError> {
        Ok(parse_list(self.get(DOWNLOAD_STORAGE).await?.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::CatalogContext;
    use tempfile::tempdir;

    #[test]
    fn test_parse_update_minutes() {
        assert_eq!(parse_update_minutes(None), 180);
        assert_eq!(parse_update_minutes(Some("abc")), 180);
        assert_eq!(parse_update_minutes(Some("0")), 180);
        assert_eq!(parse_update_minutes(Some(" 30 ")), 30);
        assert_eq!(parse_update_minutes(Some("10080")), MAX_UPDATE_MINUTES);
        assert_eq!(parse_update_minutes(Some("10081")), 180);
        assert_eq!(parse_update_minutes(Some("18446744073709551615")), 180);
    }

    #[test]
    fn test_update_interval_never_overflows() {
        assert_eq!(update_interval(30), Duration::from_secs(1800));
        assert_eq!(
            update_interval(u64::MAX),
            Duration::from_secs(MAX_UPDATE_MINUTES * 60)
        );
        let minutes = parse_update_minutes(Some("18446744073709551615"));
        assert_eq!(update_interval(minutes), Duration::from_secs(180 * 60));
    }

    #[test]
    fn test_parse_crawl_roots() {
        assert_eq!(parse_crawl_roots(None), vec![DEFAULT_CRAWL_ROOT]);
        assert_eq!(parse_crawl_roots(Some(" ; ")), vec![DEFAULT_CRAWL_ROOT]);
        assert_eq!(
            parse_crawl_roots(Some("https://a/;https://b/")),
            vec!["https://a/", "https://b/"]
        );
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let dir = tempdir().unwrap();
        let ctx = CatalogContext::new(&dir.path().join("settings.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.settings();

        assert_eq!(repo.get(TIME_UPDATE).await.unwrap(), None);
        assert_eq!(repo.update_minutes().await.unwrap(), 180);

        repo.set(TIME_UPDATE, "15").await.unwrap();
        repo.set(TIME_UPDATE, "20").await.unwrap();
        repo.set(DOWNLOAD_STORAGE, "local").await.unwrap();

        assert_eq!(repo.update_minutes().await.unwrap(), 20);
        assert_eq!(repo.enabled_backends().await.unwrap(), vec!["local"]);
        assert_eq!(repo.crawl_roots().await.unwrap(), vec![DEFAULT_CRAWL_ROOT]);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, DOWNLOAD_STORAGE);
    }
}
