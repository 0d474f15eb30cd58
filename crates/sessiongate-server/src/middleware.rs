use std::time::Instant;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::info;

use crate::http::operation_name;

/// Log one line per request: host, uri, method, operation, elapsed time and status.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let op = operation_name(uri.path());

    let response = next.run(request).await;

    info!(
        host = %host,
        uri = %uri,
        method = %method,
        op = op,
        elapsed_ms = started.elapsed().as_millis() as u64,
        status = response.status().as_u16(),
        "Handled request"
    );
    response
}
