//! Directory-service authentication.
//!
//! Stands in for an LDAP bind: a single configured principal is accepted and
//! the organization is ignored. Replace the check in `authenticate` with a
//! real bind once a directory client is wired in.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{AuthModule, AuthModuleError, AuthOutcome, Credentials};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub enabled: bool,
    pub server: String,
    pub protocol: String,
    pub username: String,
    pub password: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server: "ldap-server1".to_string(),
            protocol: "ldap3v".to_string(),
            username: "contiv".to_string(),
            password: "123".to_string(),
        }
    }
}

pub struct DirectoryModule {
    server: String,
    protocol: String,
    username: String,
    password: String,
}

impl DirectoryModule {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            server: config.server.clone(),
            protocol: config.protocol.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

#[async_trait]
impl AuthModule for DirectoryModule {
    fn name(&self) -> &str {
        "directory"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthOutcome, AuthModuleError> {
        debug!(server = %self.server, protocol = %self.protocol, "Directory lookup");
        if credentials.username == self.username && credentials.password == self.password {
            return Ok(AuthOutcome::success("success"));
        }
        Ok(AuthOutcome::invalid_credentials())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_configured_principal_any_org() {
        let module = DirectoryModule::new(&DirectoryConfig::default());
        let outcome = module
            .authenticate(&Credentials::new("contiv", "123", "whatever"))
            .await
            .unwrap();
        assert!(outcome.authenticated);
    }

    #[tokio::test]
    async fn test_rejects_anything_else() {
        let module = DirectoryModule::new(&DirectoryConfig::default());
        for (user, pass) in [("contiv", "1234"), ("admin", "123"), ("", "")] {
            let outcome = module
                .authenticate(&Credentials::new(user, pass, ""))
                .await
                .unwrap();
            assert_eq!(outcome, AuthOutcome::invalid_credentials());
        }
    }
}
