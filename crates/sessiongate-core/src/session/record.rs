use std::collections::HashMap;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Key holding the authenticated identity.
pub const USERNAME_KEY: &str = "username";

/// Key holding the RFC 3339 time of the last successful login or validation.
pub const LAST_LOGIN_KEY: &str = "lastLoginTime";

/// `max_age` value that tells the store to drop the record immediately.
pub const EXPIRE_NOW: i64 = -1;

/// Session token length in random bytes (hex encoded to twice this).
const TOKEN_BYTES: usize = 32;

/// Server-side session state correlated to a client-held token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    #[serde(default)]
    pub values: HashMap<String, String>,
    /// Lifetime in seconds; negative means terminate now.
    pub max_age: i64,
    /// True when the store had no prior record for the presented token.
    #[serde(skip)]
    pub is_new: bool,
}

impl SessionRecord {
    /// A fresh, empty record with a newly generated token.
    pub fn fresh(max_age: i64) -> Self {
        Self {
            token: generate_token(),
            values: HashMap::new(),
            max_age,
            is_new: true,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.values
            .get(USERNAME_KEY)
            .map(String::as_str)
            .filter(|u| !u.is_empty())
    }

    pub fn last_login_raw(&self) -> Option<&str> {
        self.values.get(LAST_LOGIN_KEY).map(String::as_str)
    }

    /// Attach an identity and stamp the login time.
    pub fn mark_authenticated(&mut self, username: &str, now: DateTime<Utc>) {
        self.values.insert(USERNAME_KEY.to_string(), username.to_string());
        self.touch(now);
    }

    /// Move the login time forward.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.values.insert(LAST_LOGIN_KEY.to_string(), format_timestamp(now));
    }

    pub fn terminate(&mut self) {
        self.max_age = EXPIRE_NOW;
    }

    pub fn is_terminated(&self) -> bool {
        self.max_age < 0
    }

    /// Token prefix safe to put in logs.
    pub fn log_id(&self) -> &str {
        let end = self.token.len().min(8);
        &self.token[..end]
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Deadline `max_age` seconds after `from`. Lifetimes past chrono's range
/// never expire.
pub fn expiry_after(from: DateTime<Utc>, max_age: i64) -> DateTime<Utc> {
    Duration::try_seconds(max_age)
        .and_then(|age| from.checked_add_signed(age))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Generate an opaque session token: 256 random bits, lowercase hex.
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Tokens are only ever lowercase hex of the generated length.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2
        && token.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fresh_record_is_new_and_empty() {
        let record = SessionRecord::fresh(3600);
        assert!(record.is_new);
        assert!(record.values.is_empty());
        assert!(is_well_formed_token(&record.token));
        assert_eq!(record.username(), None);
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_token_shape_check() {
        assert!(!is_well_formed_token(""));
        assert!(!is_well_formed_token("../../etc/passwd"));
        assert!(!is_well_formed_token(&"A".repeat(64)));
        assert!(is_well_formed_token(&"0f".repeat(32)));
    }

    #[test]
    fn test_mark_authenticated_sets_both_keys() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let mut record = SessionRecord::fresh(60);
        record.mark_authenticated("alice", now);

        assert_eq!(record.username(), Some("alice"));
        assert_eq!(record.last_login_raw(), Some("2024-03-01T12:30:00Z"));
    }

    #[test]
    fn test_empty_username_is_absent() {
        let mut record = SessionRecord::fresh(60);
        record.values.insert(USERNAME_KEY.to_string(), String::new());
        assert_eq!(record.username(), None);
    }

    #[test]
    fn test_terminate() {
        let mut record = SessionRecord::fresh(60);
        assert!(!record.is_terminated());
        record.terminate();
        assert!(record.is_terminated());
        assert_eq!(record.max_age, EXPIRE_NOW);
    }

    #[test]
    fn test_expiry_after_saturates() {
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(expiry_after(from, 60), Utc.with_ymd_and_hms(2024, 6, 1, 10, 1, 0).unwrap());
        assert_eq!(expiry_after(from, i64::MAX / 2), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expiry_after(from, i64::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
