use chrono::{DateTime, Duration, Utc};

use crate::auth::AuthOutcome;
use crate::error::{GatewayError, Result};

use super::SessionRecord;

pub const INVALID_SESSION: &str = "Invalid Session";

/// Where a session stands, as decided by [`SessionValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The store had no record for the presented token.
    New,
    /// Within the timeout window and carrying an identity.
    Valid { username: String },
    /// A stored record that never completed a login.
    Unauthenticated,
    /// Timed out, or stamped in the future.
    Expired,
}

/// What the caller should do to the record after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionIntent {
    Refresh,
    Terminate,
}

impl SessionStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionStatus::Valid { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            SessionStatus::Valid { username } => Some(username),
            _ => None,
        }
    }

    pub fn outcome(&self) -> AuthOutcome {
        if self.is_valid() {
            AuthOutcome::success("Success")
        } else {
            AuthOutcome::rejected(INVALID_SESSION)
        }
    }

    pub fn intent(&self) -> SessionIntent {
        if self.is_valid() {
            SessionIntent::Refresh
        } else {
            SessionIntent::Terminate
        }
    }
}

/// Decides session validity from the elapsed time since the last login.
///
/// Reads the record only; applying the decision is up to the caller.
#[derive(Debug, Clone, Copy)]
pub struct SessionValidator {
    timeout: Duration,
}

impl SessionValidator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Timeout given in (possibly fractional) minutes.
    pub fn from_minutes(minutes: f64) -> Self {
        let minutes = if minutes.is_finite() { minutes.max(0.0) } else { 0.0 };
        Self::new(Duration::milliseconds((minutes * 60_000.0).round() as i64))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn validate(&self, record: &SessionRecord) -> Result<SessionStatus> {
        self.validate_at(record, Utc::now())
    }

    /// Valid iff `0 <= now - lastLoginTime <= timeout`.
    ///
    /// An unparsable timestamp is corruption and comes back as an error, not
    /// as an expired session.
    pub fn validate_at(&self, record: &SessionRecord, now: DateTime<Utc>) -> Result<SessionStatus> {
        if record.is_new {
            return Ok(SessionStatus::New);
        }

        let Some(raw) = record.last_login_raw() else {
            return Ok(SessionStatus::Unauthenticated);
        };

        let last_login = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| GatewayError::SessionCorrupt(format!("lastLoginTime {:?}: {}", raw, e)))?
            .with_timezone(&Utc);

        let elapsed = now - last_login;
        if elapsed < Duration::zero() || elapsed > self.timeout {
            return Ok(SessionStatus::Expired);
        }

        match record.username() {
            Some(username) => Ok(SessionStatus::Valid {
                username: username.to_string(),
            }),
            None => Ok(SessionStatus::Unauthenticated),
        }
    }
}
