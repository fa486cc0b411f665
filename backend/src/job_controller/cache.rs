//! Reuse of finished analyses for identical submissions.
//!
//! Keys are md5 digests of `{text}:{rule_set_id}:{date|current}`; values are
//! the session id of a completed job plus an expiry.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::requests::{CacheConfig, CacheStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub fn document_hash(text: &str, rule_set_id: i64, effective_date: Option<NaiveDate>) -> String {
    let date = effective_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "current".to_string());
    let mut hasher = md5::Context::new();
    hasher.consume(format!("{}:{}:{}", text, rule_set_id, date).as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    session_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CacheInner {
    enabled: bool,
    ttl_hours: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone)]
pub struct AnalysisCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl AnalysisCache {
    pub fn new(enabled: bool, ttl_hours: u32) -> Self {
        AnalysisCache {
            inner: Arc::new(RwLock::new(CacheInner {
                enabled,
                ttl_hours,
                entries: HashMap::new(),
            })),
        }
    }

    /// Session id of a live entry, if caching is on.
    pub async fn lookup(&self, hash: &str, now: DateTime<Utc>) -> Option<String> {
        let inner = self.inner.read().await;
        if !inner.enabled {
            return None;
        }
        inner
            .entries
            .get(hash)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.session_id.clone())
    }

    /// Remembers a completed job. No-op while caching is off.
    pub async fn store(&self, hash: &str, session_id: &str, now: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        if !inner.enabled {
            return;
        }
        let expires_at = now + Duration::hours(i64::from(inner.ttl_hours));
        inner.entries.insert(
            hash.to_string(),
            CacheEntry {
                session_id: session_id.to_string(),
                expires_at,
            },
        );
    }

    pub async fn invalidate(&self, hash: &str) {
        self.inner.write().await.entries.remove(hash);
    }

    /// Drops every entry pointing at `session_id` (e.g. after a delete).
    pub async fn forget_session(&self, session_id: &str) {
        self.inner
            .write()
            .await
            .entries
            .retain(|_, entry| entry.session_id != session_id);
    }

    pub async fn configure(&self, config: &CacheConfig) {
        let mut inner = self.inner.write().await;
        inner.enabled = config.enabled;
        inner.ttl_hours = config.ttl_hours;
    }

    /// Removes all entries and returns how many there were.
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let count = inner.entries.len();
        inner.entries.clear();
        count
    }

    pub async fn status(&self, now: DateTime<Utc>) -> CacheStatus {
        let inner = self.inner.read().await;
        let total = inner.entries.len();
        let valid = inner
            .entries
            .values()
            .filter(|entry| entry.expires_at > now)
            .count();
        CacheStatus {
            cache_enabled: inner.enabled,
            ttl_hours: inner.ttl_hours,
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_depends_on_rule_set_and_date() {
        let text = "Client agrees to the fee schedule.";
        let a = document_hash(text, 1, None);
        assert_eq!(a, document_hash(text, 1, None));
        assert_ne!(a, document_hash(text, 2, None));
        assert_ne!(a, document_hash(text, 1, NaiveDate::from_ymd_opt(2024, 1, 1)));
        assert_eq!(a.len(), 32);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = AnalysisCache::new(true, 1);
        let now = Utc::now();
        cache.store("h", "session-1", now).await;
        assert_eq!(cache.lookup("h", now).await.as_deref(), Some("session-1"));
        let later = now + Duration::hours(2);
        assert_eq!(cache.lookup("h", later).await, None);

        let status = cache.status(later).await;
        assert_eq!(status.total_entries, 1);
        assert_eq!(status.expired_entries, 1);
    }

    #[tokio::test]
    async fn disabled_cache_neither_stores_nor_serves() {
        let cache = AnalysisCache::new(true, 24);
        let now = Utc::now();
        cache.store("h", "session-1", now).await;
        cache
            .configure(&CacheConfig {
                enabled: false,
                ttl_hours: 24,
            })
            .await;
        assert_eq!(cache.lookup("h", now).await, None);
        cache.store("h2", "session-2", now).await;
        assert_eq!(cache.status(now).await.total_entries, 1);
        assert_eq!(cache.clear().await, 1);
    }
}
