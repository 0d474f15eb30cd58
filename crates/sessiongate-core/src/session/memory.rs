use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use super::record::expiry_after;
use super::{SessionRecord, SessionStore, StoreError};

struct Entry {
    record: SessionRecord,
    evict_at: DateTime<Utc>,
}

/// Process-local session store. Expired entries are dropped when looked up.
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    default_max_age: i64,
}

impl MemorySessionStore {
    pub fn new(default_max_age: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_max_age,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn lookup(&self, token: &str, now: DateTime<Utc>) -> Option<SessionRecord> {
        let mut entries = self.entries.lock();
        match entries.get(token) {
            Some(entry) if entry.evict_at >= now => {
                let mut record = entry.record.clone();
                record.is_new = false;
                Some(record)
            }
            Some(_) => {
                debug!(session = &token[..token.len().min(8)], "Evicting expired session");
                entries.remove(token);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, token: Option<&str>) -> Result<SessionRecord, StoreError> {
        if let Some(token) = token {
            if let Some(record) = self.lookup(token, Utc::now()) {
                return Ok(record);
            }
        }
        Ok(SessionRecord::fresh(self.default_max_age))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if record.is_terminated() {
            entries.remove(&record.token);
            return Ok(());
        }

        let mut stored = record.clone();
        stored.is_new = false;
        entries.insert(
            record.token.clone(),
            Entry {
                record: stored,
                evict_at: expiry_after(Utc::now(), record.max_age),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_token_gives_fresh_record() {
        let store = MemorySessionStore::new(600);
        let record = store.get(Some("deadbeef")).await.unwrap();
        assert!(record.is_new);
        assert_ne!(record.token, "deadbeef");
        assert_eq!(record.max_age, 600);

        let record = store.get(None).await.unwrap();
        assert!(record.is_new);
    }

    #[tokio::test]
    async fn test_round_trip_marks_not_new() {
        let store = MemorySessionStore::new(600);
        let mut record = store.get(None).await.unwrap();
        record.mark_authenticated("alice", Utc::now());
        store.save(&record).await.unwrap();

        let loaded = store.get(Some(&record.token)).await.unwrap();
        assert!(!loaded.is_new);
        assert_eq!(loaded.username(), Some("alice"));
        assert_eq!(loaded.token, record.token);
    }

    #[tokio::test]
    async fn test_terminated_save_removes() {
        let store = MemorySessionStore::new(600);
        let mut record = store.get(None).await.unwrap();
        store.save(&record).await.unwrap();
        assert_eq!(store.len(), 1);

        record.terminate();
        store.save(&record).await.unwrap();
        assert!(store.is_empty());

        // Terminating again is harmless
        store.save(&record).await.unwrap();
        assert!(store.get(Some(&record.token)).await.unwrap().is_new);
    }

    #[tokio::test]
    async fn test_zero_max_age_is_evicted_lazily() {
        let store = MemorySessionStore::new(600);
        let mut record = store.get(None).await.unwrap();
        record.max_age = 0;
        store.save(&record).await.unwrap();

        // Still counted until someone asks for it
        assert_eq!(store.len(), 1);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(store.get(Some(&record.token)).await.unwrap().is_new);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_huge_max_age_keeps_session() {
        let store = MemorySessionStore::new(i64::MAX / 2);
        let mut record = store.get(None).await.unwrap();
        record.mark_authenticated("alice", Utc::now());
        store.save(&record).await.unwrap();

        assert!(!store.get(Some(&record.token)).await.unwrap().is_new);
    }
}
