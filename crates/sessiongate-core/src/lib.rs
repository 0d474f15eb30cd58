//! Core of the sessiongate API gateway.
//!
//! Authentication chain, session lifecycle, route table and upstream
//! dispatch, tied together by [`Gateway`]. The HTTP boundary lives in the
//! `sessiongate-server` crate.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod session;

pub use api::{ApiError, ReqwestUpstream, UpstreamClient, UpstreamResponse};
pub use auth::{AuthManager, AuthModule, AuthOutcome, Credentials};
pub use config::{GatewayConfig, SessionConfig, StoreConfig};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayRequest, LoginReply, ProxyReply, SessionBound, SessionTicket};
pub use routes::{ProxyMethod, RouteRule, RouteTable};
pub use session::{LockMode, SessionRecord, SessionStore, SessionValidator};
