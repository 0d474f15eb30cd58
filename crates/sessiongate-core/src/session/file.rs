//! Session store persisting one JSON document per session.
//!
//! Sessions live at `<dir>/<token>.json`. Only well-formed tokens are ever
//! turned into paths; anything else is treated as unknown.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::record::{expiry_after, is_well_formed_token};
use super::{SessionRecord, SessionStore, StoreError};

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    record: SessionRecord,
    saved_at: DateTime<Utc>,
}

impl StoredSession {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > expiry_after(self.saved_at, self.record.max_age)
    }
}

pub struct FileSessionStore {
    dir: PathBuf,
    default_max_age: i64,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>, default_max_age: i64) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            default_max_age,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, token: &str) -> PathBuf {
        self.dir.join(format!("{}.json", token))
    }

    fn load(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        if !is_well_formed_token(token) {
            return Ok(None);
        }

        let path = self.session_path(token);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let stored: StoredSession = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding unreadable session file");
                remove_if_present(&path)?;
                return Ok(None);
            }
        };

        if stored.is_expired(Utc::now()) {
            debug!(session = &token[..8], "Evicting expired session file");
            remove_if_present(&path)?;
            return Ok(None);
        }

        let mut record = stored.record;
        record.is_new = false;
        Ok(Some(record))
    }
}

fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, token: Option<&str>) -> Result<SessionRecord, StoreError> {
        if let Some(token) = token {
            if let Some(record) = self.load(token)? {
                return Ok(record);
            }
        }
        Ok(SessionRecord::fresh(self.default_max_age))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        if !is_well_formed_token(&record.token) {
            return Err(StoreError::Unavailable(
                "refusing to persist a malformed session token".to_string(),
            ));
        }

        let path = self.session_path(&record.token);
        if record.is_terminated() {
            return remove_if_present(&path);
        }

        let stored = StoredSession {
            record: record.clone(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileSessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions"), 600).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let (_dir, store) = store();
        let mut record = store.get(None).await.unwrap();
        record.mark_authenticated("bob", Utc::now());
        store.save(&record).await.unwrap();

        let reopened = FileSessionStore::new(store.dir(), 600).unwrap();
        let loaded = reopened.get(Some(&record.token)).await.unwrap();
        assert!(!loaded.is_new);
        assert_eq!(loaded.username(), Some("bob"));
    }

    #[tokio::test]
    async fn test_terminate_deletes_file() {
        let (_dir, store) = store();
        let mut record = store.get(None).await.unwrap();
        store.save(&record).await.unwrap();
        assert!(store.session_path(&record.token).exists());

        record.terminate();
        store.save(&record).await.unwrap();
        assert!(!store.session_path(&record.token).exists());
        // Idempotent
        store.save(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_token_is_unknown() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("secret.json"), "{}").unwrap();

        let record = store.get(Some("../secret")).await.unwrap();
        assert!(record.is_new);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_discarded() {
        let (_dir, store) = store();
        let token = "ab".repeat(32);
        std::fs::write(store.session_path(&token), "garbage").unwrap();

        let record = store.get(Some(&token)).await.unwrap();
        assert!(record.is_new);
        assert!(!store.session_path(&token).exists());
    }

    #[tokio::test]
    async fn test_expired_file_is_evicted() {
        let (_dir, store) = store();
        let mut record = store.get(None).await.unwrap();
        record.is_new = false;
        let stored = StoredSession {
            record: record.clone(),
            saved_at: Utc::now() - chrono::Duration::seconds(601),
        };
        std::fs::write(
            store.session_path(&record.token),
            serde_json::to_string(&stored).unwrap(),
        )
        .unwrap();

        assert!(store.get(Some(&record.token)).await.unwrap().is_new);
        assert!(!store.session_path(&record.token).exists());
    }

    #[tokio::test]
    async fn test_huge_max_age_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path(), i64::MAX).unwrap();
        let mut record = store.get(None).await.unwrap();
        record.mark_authenticated("alice", Utc::now());
        store.save(&record).await.unwrap();

        assert!(!store.get(Some(&record.token)).await.unwrap().is_new);
    }
}
