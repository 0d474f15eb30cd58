//! HTTP boundary of the sessiongate gateway.

pub mod http;
pub mod middleware;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use sessiongate_core::Gateway;
use tower_http::trace::TraceLayer;

use crate::http::{AppState, HEALTH_PATH, LOGIN_PATH, LOGOUT_PATH, VALIDATE_PATH};

/// Build the router. Anything that is not a gateway endpoint is proxied.
pub fn app(gateway: Arc<Gateway>, cookie_name: &str) -> Router {
    let state = AppState::new(gateway, cookie_name);

    Router::new()
        .route(LOGIN_PATH, post(http::login))
        .route(LOGOUT_PATH, delete(http::logout))
        .route(VALIDATE_PATH, get(http::validate))
        .route(HEALTH_PATH, get(http::health))
        .fallback(http::proxy)
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
