use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// How session operations are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// One lock for every operation on the instance.
    #[default]
    Global,
    /// One lock per presented session token.
    PerSession,
}

/// Held for the full duration of a session operation.
pub struct SessionLease {
    _guard: Option<OwnedMutexGuard<()>>,
}

pub struct SessionLocks {
    mode: LockMode,
    global: Arc<AsyncMutex<()>>,
    keyed: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new(mode: LockMode) -> Self {
        Self {
            mode,
            global: Arc::new(AsyncMutex::new(())),
            keyed: Mutex::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Wait for exclusive access. Without a token there is no existing
    /// session to race on, so per-session mode hands out an empty lease.
    pub async fn acquire(&self, token: Option<&str>) -> SessionLease {
        let lock = match (self.mode, token) {
            (LockMode::Global, _) => self.global.clone(),
            (LockMode::PerSession, None) => return SessionLease { _guard: None },
            (LockMode::PerSession, Some(token)) => {
                let mut keyed = self.keyed.lock();
                // Drop locks nobody holds or waits on
                keyed.retain(|_, lock| Arc::strong_count(lock) > 1);
                keyed.entry(token.to_string()).or_default().clone()
            }
        };

        SessionLease {
            _guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.keyed.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_millis(30);

    #[tokio::test]
    async fn test_global_serializes_unrelated_sessions() {
        let locks = SessionLocks::new(LockMode::Global);
        let _held = locks.acquire(Some("a")).await;

        assert!(timeout(WAIT, locks.acquire(Some("b"))).await.is_err());
        assert!(timeout(WAIT, locks.acquire(None)).await.is_err());
    }

    #[tokio::test]
    async fn test_per_session_only_blocks_same_token() {
        let locks = SessionLocks::new(LockMode::PerSession);
        let held = locks.acquire(Some("a")).await;

        assert!(timeout(WAIT, locks.acquire(Some("a"))).await.is_err());
        assert!(timeout(WAIT, locks.acquire(Some("b"))).await.is_ok());
        assert!(timeout(WAIT, locks.acquire(None)).await.is_ok());

        drop(held);
        assert!(timeout(WAIT, locks.acquire(Some("a"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_per_session_registry_is_pruned() {
        let locks = SessionLocks::new(LockMode::PerSession);
        for i in 0..10 {
            let _lease = locks.acquire(Some(&format!("token-{}", i))).await;
        }
        let _last = locks.acquire(Some("final")).await;
        assert_eq!(locks.tracked_keys(), 1);
    }
}
