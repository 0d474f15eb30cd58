//! Credential checking.
//!
//! This module provides:
//! - `Credentials` / `AuthOutcome`: the data passed through the chain
//! - `AuthModule`: the capability every backend implements
//! - `DirectoryModule`, `LocalFileModule`: the bundled backends
//! - `AuthManager`: ordered, short-circuiting chain over the modules

pub mod credentials;
pub mod directory;
pub mod local;
pub mod manager;
pub mod module;

pub use credentials::{AuthOutcome, Credentials, INVALID_CREDENTIALS};
pub use directory::{DirectoryConfig, DirectoryModule};
pub use local::{hash_password, LocalCredential, LocalFileModule};
pub use manager::AuthManager;
pub use module::{AuthModule, AuthModuleError};
