//! Gateway configuration.
//!
//! Configuration is a JSON document; every field has a default so an absent
//! file still yields a runnable gateway. Unless a path is given explicitly it
//! is looked up at `~/.config/sessiongate/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::auth::DirectoryConfig;
use crate::session::LockMode;

/// Application name used for the config directory path
const APP_NAME: &str = "sessiongate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default cookie lifetime: 30 days
const DEFAULT_MAX_AGE_SECS: i64 = 86400 * 30;

/// Idle timeout, in minutes, after which a session must log in again
const DEFAULT_TIMEOUT_MINUTES: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    File { dir: PathBuf },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub timeout_minutes: f64,
    pub max_age_secs: i64,
    pub lock_mode: LockMode,
    pub store: StoreConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sessiongate-session".to_string(),
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            lock_mode: LockMode::default(),
            store: StoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen_addr: String,
    pub routes_file: PathBuf,
    pub local_auth_file: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub upstream_timeout_secs: Option<u64>,
    pub session: SessionConfig,
    pub directory: DirectoryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9000".to_string(),
            routes_file: PathBuf::from("apiconfig.json"),
            local_auth_file: PathBuf::from("localauthfile.json"),
            log_dir: None,
            upstream_timeout_secs: None,
            session: SessionConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    info!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.session.timeout_minutes, 0.4);
        assert_eq!(config.session.lock_mode, LockMode::Global);
        assert_eq!(config.session.store, StoreConfig::Memory);
        assert!(config.directory.enabled);
        assert_eq!(config.upstream_timeout(), None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "listen_addr": "127.0.0.1:8080",
                "upstream_timeout_secs": 15,
                "session": {{
                    "timeout_minutes": 30,
                    "lock_mode": "per_session",
                    "store": {{ "kind": "file", "dir": "/var/lib/sessiongate" }}
                }},
                "directory": {{ "enabled": false }}
            }}"#
        )
        .unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.upstream_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.session.timeout_minutes, 30.0);
        assert_eq!(config.session.lock_mode, LockMode::PerSession);
        assert_eq!(
            config.session.store,
            StoreConfig::File {
                dir: PathBuf::from("/var/lib/sessiongate")
            }
        );
        assert_eq!(config.session.cookie_name, "sessiongate-session");
        assert!(!config.directory.enabled);
        assert_eq!(config.directory.server, "ldap-server1");
        assert_eq!(config.routes_file, PathBuf::from("apiconfig.json"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GatewayConfig::load(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(GatewayConfig::from_file(file.path()).is_err());
    }
}
