use async_trait::async_trait;
use thiserror::Error;

use super::SessionRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Durable map from session token to record.
///
/// `get` never fails for an unknown, malformed or evicted token: it hands
/// back a fresh record with `is_new == true` and a new token. `save` with a
/// negative `max_age` removes the record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, token: Option<&str>) -> Result<SessionRecord, StoreError>;

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;
}
