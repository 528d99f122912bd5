use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::models::domain::{Difficulty, Question};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
}

/// Bounded cache with per-entry TTL. Expired entries are purged before anything
/// live is evicted; at capacity the least recently read entry goes first.
pub struct ExpiringCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

pub type QuestionCache = ExpiringCache<Vec<Question>>;

impl<V: Clone + Send> ExpiringCache<V> {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
            clock,
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let expired = entries
            .get(key)
            .map(|entry| self.is_expired(entry, now))?;
        if expired {
            log::debug!("Question cache entry '{}' expired", key);
            entries.remove(key);
            return None;
        }

        entries.get_mut(key).map(|entry| {
            entry.last_accessed = now;
            entry.value.clone()
        })
    }

    pub async fn insert(&self, key: &str, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| now - entry.inserted_at < self.ttl);
        }

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                log::debug!("Question cache full, evicting '{}'", victim);
                entries.remove(&victim);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: now,
                last_accessed: now,
            },
        );
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.inserted_at >= self.ttl
    }
}

/// Composite key for a generation request, e.g. `intermediate-["ownership","traits"]-10`.
/// Topics are JSON-encoded so separators inside a topic cannot collide with other keys.
pub fn cache_key(difficulty: Difficulty, topics: &[String], number_of_questions: u32) -> String {
    let mut normalized: Vec<String> = topics
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();

    format!(
        "{}-{}-{}",
        difficulty,
        serde_json::Value::from(normalized),
        number_of_questions
    )
}
