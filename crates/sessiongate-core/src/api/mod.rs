//! Upstream dispatch plumbing.
//!
//! This module provides the `UpstreamClient` capability used by the proxy
//! step, its reqwest implementation, and `ApiError`, the closed mapping of
//! backend statuses to outcomes.

pub mod client;
pub mod error;

pub use client::{ReqwestUpstream, UpstreamClient, UpstreamResponse};
pub use error::ApiError;
