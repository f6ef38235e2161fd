use moka::future::Cache;
use moka::Expiry;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sluice_common::config::CacheSettings;
use sluice_common::SourceId;
use sluice_connectors::{Row, Rows};
use sluice_sql::lexical::collapse_whitespace;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Cache key: data-source identity plus whitespace-normalized SQL, hashed.
///
/// Case is preserved so string literals that differ only in case stay distinct.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(source: SourceId, sql: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.0.to_le_bytes());
        hasher.update(collapse_whitespace(sql).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct CachedResult {
    rows: Rows,
    ttl: Duration,
    size_bytes: u64,
}

/// Expire each entry after the TTL it was written with.
struct WriteTimeTtl;

impl Expiry<CacheKey, CachedResult> for WriteTimeTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CachedResult,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CachedResult,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-wide result cache with per-entry TTLs and a byte budget.
///
/// All operations are safe to call concurrently without external locking. Writes always
/// replace; [`AdaptiveCache::flush`] hides every earlier entry from subsequent reads at once.
pub struct AdaptiveCache {
    enabled: bool,
    cache: Cache<CacheKey, CachedResult>,
}

impl AdaptiveCache {
    pub fn new(settings: &CacheSettings) -> Self {
        info!(
            target: "cache",
            enabled = settings.enabled,
            max_size_mb = settings.max_size_mb,
            "Initializing result cache"
        );

        let cache = Cache::builder()
            .max_capacity(settings.max_size_mb * 1024 * 1024)
            .weigher(|_key: &CacheKey, entry: &CachedResult| -> u32 {
                entry.size_bytes.try_into().unwrap_or(u32::MAX)
            })
            .expire_after(WriteTimeTtl)
            .build();

        Self {
            enabled: settings.enabled,
            cache,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Rows> {
        if !self.enabled {
            return None;
        }
        let entry = self.cache.get(key).await?;
        debug!(
            target: "cache",
            key = %key,
            rows = entry.rows.len(),
            "Cache hit"
        );
        Some(entry.rows)
    }

    /// Store `rows` under `key`, replacing any previous entry. A zero TTL stores nothing.
    pub async fn set(&self, key: CacheKey, rows: Rows, ttl: Duration) {
        if !self.enabled || ttl.is_zero() {
            return;
        }
        let size_bytes = estimate_size(&rows);
        debug!(
            target: "cache",
            key = %key,
            rows = rows.len(),
            size_bytes,
            ttl_secs = ttl.as_secs(),
            "Cached query result"
        );
        self.cache
            .insert(
                key,
                CachedResult {
                    rows,
                    ttl,
                    size_bytes,
                },
            )
            .await;
    }

    pub async fn delete(&self, key: &CacheKey) {
        self.cache.invalidate(key).await;
    }

    pub async fn flush(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        info!(target: "cache", "Flushed result cache");
    }

    /// Live entries, after applying pending expirations and invalidations.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

/// Rough in-memory footprint of a result set, used as the entry weight.
fn estimate_size(rows: &[Row]) -> u64 {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|(k, v)| (k.len() + value_size(v)) as u64)
                .sum::<u64>()
        })
        .sum()
}

fn value_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) => 8,
        Value::Number(_) => 16,
        Value::String(s) => 24 + s.len(),
        Value::Array(items) => 24 + items.iter().map(value_size).sum::<usize>(),
        Value::Object(map) => {
            24 + map
                .iter()
                .map(|(k, v)| k.len() + value_size(v))
                .sum::<usize>()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn rows(n: i64) -> Rows {
        let row = json!({ "n": n });
        Arc::new(vec![row.as_object().cloned().unwrap()])
    }

    #[test]
    fn test_key_separates_sources_and_ignores_whitespace() {
        let sql = "SELECT * FROM users";
        assert_eq!(
            CacheKey::new(SourceId(1), sql),
            CacheKey::new(SourceId(1), "SELECT *\n  FROM users ")
        );
        assert_ne!(CacheKey::new(SourceId(1), sql), CacheKey::new(SourceId(2), sql));
        assert_ne!(
            CacheKey::new(SourceId(1), "SELECT 'A'"),
            CacheKey::new(SourceId(1), "SELECT 'a'")
        );
    }

    #[tokio::test]
    async fn test_set_get_replace_delete() {
        let cache = AdaptiveCache::new(&CacheSettings::default());
        let key = CacheKey::new(SourceId(1), "SELECT 1");

        assert!(cache.get(&key).await.is_none());
        cache.set(key.clone(), rows(1), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&key).await.unwrap()[0]["n"], 1);

        cache.set(key.clone(), rows(2), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&key).await.unwrap()[0]["n"], 2);
        assert_eq!(cache.entry_count().await, 1);

        cache.delete(&key).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_ttl() {
        let cache = AdaptiveCache::new(&CacheSettings::default());
        let short = CacheKey::new(SourceId(1), "SELECT 1");
        let long = CacheKey::new(SourceId(1), "SELECT 2");

        cache.set(short.clone(), rows(1), Duration::from_millis(50)).await;
        cache.set(long.clone(), rows(2), Duration::from_secs(60)).await;
        std::thread::sleep(Duration::from_millis(150));

        assert!(cache.get(&short).await.is_none());
        assert!(cache.get(&long).await.is_some());
    }

    #[tokio::test]
    async fn test_flush_hides_all_entries() {
        let cache = AdaptiveCache::new(&CacheSettings::default());
        for i in 0..10 {
            cache
                .set(CacheKey::new(SourceId(i), "SELECT 1"), rows(i), Duration::from_secs(60))
                .await;
        }
        cache.flush().await;

        for i in 0..10 {
            assert!(cache.get(&CacheKey::new(SourceId(i), "SELECT 1")).await.is_none());
        }
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let settings = CacheSettings {
            enabled: false,
            ..Default::default()
        };
        let cache = AdaptiveCache::new(&settings);
        let key = CacheKey::new(SourceId(1), "SELECT 1");
        cache.set(key.clone(), rows(1), Duration::from_secs(60)).await;
        assert!(cache.get(&key).await.is_none());
    }
}
