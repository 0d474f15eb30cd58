use std::fmt;

use serde::{Deserialize, Serialize};

/// Message returned for every rejected login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Login credentials as submitted by the client. Never persisted.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub organization: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            organization: organization.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("organization", &self.organization)
            .finish()
    }
}

/// Result of an authentication or session check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub authenticated: bool,
    pub message: String,
}

impl AuthOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            message: message.into(),
        }
    }

    /// The uniform failure used by modules and the manager.
    pub fn invalid_credentials() -> Self {
        Self::rejected(INVALID_CREDENTIALS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2", "acme");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_deserialize_missing_organization() {
        let creds: Credentials =
            serde_json::from_str(r#"{"username":"bob","password":"pw"}"#).unwrap();
        assert_eq!(creds.username, "bob");
        assert_eq!(creds.organization, "");
    }
}
