//! Username presence index.
//!
//! A cuckoo filter answers "definitely not taken" without touching the
//! database; a moka cache answers "taken" for recently active names. Only
//! when both are inconclusive does the caller query the database.

use std::sync::RwLock;
use std::time::Duration;

use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;

/// Expected capacity and false-positive rate of the filter.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

pub struct PresenceIndex {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, bool>,
}

pub static USERNAMES: Lazy<PresenceIndex> =
    Lazy::new(|| PresenceIndex::new(FILTER_CAPACITY, 50_000, Duration::from_secs(86_400)));

#[inline]
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl PresenceIndex {
    pub fn new(capacity: usize, cache_capacity: u64, ttl: Duration) -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(capacity, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(cache_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// False positives possible, false negatives not.
    pub fn might_exist(&self, name: &str) -> bool {
        let name = normalize(name);
        self.filter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&name)
    }

    pub async fn is_known_taken(&self, name: &str) -> bool {
        self.taken.get(&normalize(name)).await.unwrap_or(false)
    }

    /// Records a name in both the filter and the cache.
    pub async fn mark_taken(&self, name: &str) {
        let name = normalize(name);
        self.insert_filter(std::slice::from_ref(&name));
        self.taken.insert(name, true).await;
    }

    fn insert_filter(&self, names: &[String]) {
        let mut filter = self
            .filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for name in names {
            filter.add(name);
        }
    }

    /// Loads every username into the filter and recently active ones into
    /// the cache, streaming in batches.
    pub async fn warmup(&self, pool: &MySqlPool, batch_size: usize, recent_days: u32) -> Result<()> {
        let mut stream = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT username,
                   (last_login_at IS NOT NULL AND last_login_at >= NOW() - INTERVAL ? DAY) AS recent
            FROM users
            "#,
        )
        .bind(recent_days)
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;
        let mut cached = 0usize;

        while let Some(row) = stream.next().await {
            let (username, recent) = row.context("username row fetch failed")?;
            let username = normalize(&username);
            if recent != 0 {
                self.taken.insert(username.clone(), true).await;
                cached += 1;
            }
            batch.push(username);
            total += 1;

            if batch.len() >= batch_size {
                self.insert_filter(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_filter(&batch);
        }

        tracing::info!(total, cached, recent_days, "Username index warmup complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn unknown_names_are_definitely_absent() {
        let index = PresenceIndex::new(1_000, 100, Duration::from_secs(60));
        assert!(!index.might_exist("admin"));
        assert!(!index.is_known_taken("admin").await);
    }

    #[actix_web::test]
    async fn marked_names_are_found_case_insensitively() {
        let index = PresenceIndex::new(1_000, 100, Duration::from_secs(60));
        index.mark_taken("HR.Manager").await;
        assert!(index.might_exist("hr.manager"));
        assert!(index.is_known_taken(" hr.MANAGER ").await);
    }
}
