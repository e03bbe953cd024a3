use crate::metrics_defs::{CACHED_USERS, CACHE_HIT, CACHE_MISS};
use crate::types::{ActivityRecord, UserId};
use parking_lot::RwLock;
use shared::{counter, gauge};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Debug)]
struct CacheEntry {
    activities: Arc<[ActivityRecord]>,
    fetched_at: Instant,
}

/// Per-user cache of filtered activities.
///
/// A single map behind one reader/writer lock: reads share the lock, a write
/// for any user excludes every other reader and writer. Entries older than the
/// freshness window read as a miss but are not removed; the next write for the
/// user replaces them.
pub struct UserCache {
    entries: RwLock<HashMap<UserId, CacheEntry>>,
    freshness: Duration,
}

impl UserCache {
    pub fn new(freshness: Duration) -> Self {
        UserCache {
            entries: RwLock::new(HashMap::new()),
            freshness,
        }
    }

    pub fn read(&self, user_id: &str) -> Option<Arc<[ActivityRecord]>> {
        let hit = self
            .entries
            .read()
            .get(user_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.freshness)
            .map(|entry| entry.activities.clone());

        match hit {
            Some(_) => counter!(CACHE_HIT).increment(1),
            None => counter!(CACHE_MISS).increment(1),
        }
        hit
    }

    pub fn write(&self, user_id: &str, activities: Arc<[ActivityRecord]>) {
        let entry = CacheEntry {
            activities,
            fetched_at: Instant::now(),
        };
        let users = {
            let mut entries = self.entries.write();
            entries.insert(user_id.to_string(), entry);
            entries.len()
        };
        gauge!(CACHED_USERS).set(users as f64);
    }

    /// Number of users with an entry, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
