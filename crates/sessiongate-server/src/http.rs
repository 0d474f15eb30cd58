//! HTTP handlers for the four gateway operations.
//!
//! Handlers translate between axum requests and [`Gateway`] calls: the
//! session token comes in through a cookie and goes back out through
//! `Set-Cookie`, and [`GatewayError`]s become status codes.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use sessiongate_core::{
    ApiError, Credentials, Gateway, GatewayError, GatewayRequest, ProxyReply, SessionBound,
    SessionTicket,
};
use tracing::{debug, error, warn};

pub const LOGIN_PATH: &str = "/loginvalidate/";
pub const LOGOUT_PATH: &str = "/logoutuser/";
pub const VALIDATE_PATH: &str = "/validateapp/";
pub const HEALTH_PATH: &str = "/health";

const EXPIRED_COOKIE_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub cookie_name: Arc<str>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, cookie_name: &str) -> Self {
        Self {
            gateway,
            cookie_name: Arc::from(cookie_name),
        }
    }

    fn token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        session_token(headers, &self.cookie_name)
    }

    fn set_cookie(&self, response: &mut Response, ticket: &SessionTicket) {
        let value = session_cookie(&self.cookie_name, ticket);
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Session cookie is not a valid header value"),
        }
    }

    fn respond<T: IntoResponse>(&self, bound: SessionBound<T>) -> Response {
        let mut response = bound.value.into_response();
        if let Some(ticket) = &bound.session {
            self.set_cookie(&mut response, ticket);
        }
        response
    }
}

/// Name used for an operation in request logs.
///
/// The gateway's own paths never reach the proxy, so a wrong method on one
/// of them is logged under that endpoint (axum answers 405).
pub fn operation_name(path: &str) -> &'static str {
    match path {
        LOGIN_PATH => "login",
        LOGOUT_PATH => "logout",
        VALIDATE_PATH => "validate",
        HEALTH_PATH => "health",
        _ => "proxy",
    }
}

/// Find the session token among the request's cookies.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value)
}

/// `Set-Cookie` value for a ticket. Terminated sessions clear the cookie.
pub fn session_cookie(cookie_name: &str, ticket: &SessionTicket) -> String {
    if ticket.is_terminated() {
        format!(
            "{}=; Path=/; Max-Age=0; Expires={}; HttpOnly; SameSite=Lax",
            cookie_name, EXPIRED_COOKIE_DATE
        )
    } else {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            cookie_name, ticket.token, ticket.max_age
        )
    }
}

/// A [`GatewayError`] rendered as a plain-text response.
pub struct HttpError(pub GatewayError);

pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::RouteNotFound | GatewayError::Upstream(ApiError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        GatewayError::Upstream(ApiError::AccessDenied) => StatusCode::FORBIDDEN,
        GatewayError::Upstream(ApiError::ServerError(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::Upstream(ApiError::Status(_)) => StatusCode::BAD_GATEWAY,
        GatewayError::Transport(_) | GatewayError::AuthUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        GatewayError::SessionCorrupt(_) | GatewayError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(kind = self.0.kind(), error = %self.0, "Request failed");
        } else {
            debug!(kind = self.0.kind(), error = %self.0, "Request failed");
        }
        (status, self.0.to_string()).into_response()
    }
}

fn bad_request(message: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}

pub async fn login(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let credentials: Credentials = match serde_json::from_slice(&body) {
        Ok(credentials) => credentials,
        Err(e) => {
            debug!(error = %e, "Undecodable login body");
            return bad_request("invalid login request");
        }
    };

    match state.gateway.login(state.token(&headers), &credentials).await {
        Ok(bound) => state.respond(SessionBound {
            value: Json(bound.value),
            session: bound.session,
        }),
        Err(err) => HttpError(err).into_response(),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.gateway.logout(state.token(&headers)).await {
        Ok(bound) => state.respond(SessionBound {
            value: StatusCode::OK,
            session: bound.session,
        }),
        Err(err) => HttpError(err).into_response(),
    }
}

pub async fn validate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.gateway.validate_session(state.token(&headers)).await {
        Ok(bound) => state.respond(SessionBound {
            value: Json(bound.value),
            session: bound.session,
        }),
        Err(err) => HttpError(err).into_response(),
    }
}

/// Everything that is not one of the gateway's own endpoints.
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut request = GatewayRequest::new(method.as_str(), uri.path());
    if let Some(query) = uri.query() {
        request = request.with_query(query);
    }
    if (method == Method::POST || method == Method::PUT) && !body.is_empty() {
        if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
            return bad_request("request body is not valid JSON");
        }
        request = request.with_body(body.to_vec());
    }

    let bound = match state.gateway.api_proxy(state.token(&headers), &request).await {
        Ok(bound) => bound,
        Err(err) => return HttpError(err).into_response(),
    };

    let value = match &bound.value {
        ProxyReply::Forwarded(body) if body.is_empty() => StatusCode::OK.into_response(),
        ProxyReply::Forwarded(body) => match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(json) => Json(json).into_response(),
            Err(e) => {
                warn!(path = %request.path, error = %e, "Upstream answered with non-JSON body");
                (StatusCode::INTERNAL_SERVER_ERROR, "error in encoding response").into_response()
            }
        },
        ProxyReply::Unauthenticated => {
            (StatusCode::UNAUTHORIZED, "Invalid Session").into_response()
        }
    };

    state.respond(SessionBound {
        value,
        session: bound.session,
    })
}

pub async fn health() -> &'static str {
    "ok"
}
