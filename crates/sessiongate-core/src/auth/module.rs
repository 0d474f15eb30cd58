use async_trait::async_trait;
use thiserror::Error;

use super::{AuthOutcome, Credentials};

/// A backend failure inside a module, as opposed to a rejection.
#[derive(Error, Debug)]
pub enum AuthModuleError {
    #[error("authentication backend '{module}' unavailable: {reason}")]
    Unavailable { module: String, reason: String },
}

/// One authentication strategy in the chain.
///
/// Implementations must not distinguish "unknown user" from "wrong password"
/// in the returned outcome.
#[async_trait]
pub trait AuthModule: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthOutcome, AuthModuleError>;
}
