//! Error taxonomy shared by the gateway operations.
//!
//! Rejected credentials and expired sessions are not errors: they come back
//! as an [`AuthOutcome`](crate::auth::AuthOutcome) with `authenticated == false`.
//! The variants here mean the operation itself could not complete.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthModuleError;
use crate::session::StoreError;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The stored login timestamp could not be parsed.
    #[error("Corrupt session: {0}")]
    SessionCorrupt(String),

    /// No rule matched the path, or the matched rule does not allow the method.
    #[error("not found")]
    RouteNotFound,

    #[error(transparent)]
    Upstream(#[from] ApiError),

    /// The backend could not be reached at all.
    #[error("Upstream unreachable: {0}")]
    Transport(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// An authentication module failed and no other module accepted.
    #[error(transparent)]
    AuthUnavailable(#[from] AuthModuleError),
}

impl GatewayError {
    /// Short machine-friendly label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::SessionCorrupt(_) => "session_corrupt",
            GatewayError::RouteNotFound => "route_not_found",
            GatewayError::Upstream(ApiError::NotFound) => "upstream_not_found",
            GatewayError::Upstream(ApiError::AccessDenied) => "upstream_access_denied",
            GatewayError::Upstream(ApiError::ServerError(_)) => "upstream_server_error",
            GatewayError::Upstream(ApiError::Status(_)) => "upstream_status",
            GatewayError::Transport(_) => "transport",
            GatewayError::Store(_) => "store",
            GatewayError::AuthUnavailable(_) => "auth_unavailable",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
