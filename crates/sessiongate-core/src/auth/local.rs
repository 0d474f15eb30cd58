//! Authentication against a local credential file.
//!
//! The file is a JSON array of `{username, password, active}` entries, read
//! once at startup. Passwords are either plaintext or Argon2 PHC strings.

use std::path::Path;

use anyhow::{Context, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{AuthModule, AuthModuleError, AuthOutcome, Credentials};

const PHC_PREFIX: &str = "$argon2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCredential {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub active: bool,
}

impl LocalCredential {
    fn password_matches(&self, candidate: &str) -> bool {
        if self.password.starts_with(PHC_PREFIX) {
            verify_phc(&self.password, candidate)
        } else {
            self.password == candidate
        }
    }
}

fn verify_phc(phc: &str, candidate: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Unparsable password hash in local credential file");
            false
        }
    }
}

/// Hash a password into an Argon2 PHC string suitable for the credential file.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(phc.to_string())
}

/// Module backed by an immutable snapshot of the credential file.
pub struct LocalFileModule {
    entries: Vec<LocalCredential>,
}

impl LocalFileModule {
    pub fn new(entries: Vec<LocalCredential>) -> Self {
        Self { entries }
    }

    /// Load the credential file. A missing file yields an empty module.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Local credential file not found, no local users loaded");
            return Ok(Self::new(Vec::new()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credential file: {}", path.display()))?;
        let entries: Vec<LocalCredential> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credential file: {}", path.display()))?;

        info!(count = entries.len(), "Loaded local credentials");
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AuthModule for LocalFileModule {
    fn name(&self) -> &str {
        "local"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthOutcome, AuthModuleError> {
        let matched = self.entries.iter().any(|entry| {
            entry.username == credentials.username
                && entry.active
                && entry.password_matches(&credentials.password)
        });

        if matched {
            Ok(AuthOutcome::success("success"))
        } else {
            Ok(AuthOutcome::invalid_credentials())
        }
    }
}
