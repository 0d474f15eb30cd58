use thiserror::Error;

/// Non-success outcome of a proxied upstream call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Page not found!")]
    NotFound,

    #[error("Access denied!")]
    AccessDenied,

    /// Upstream 500. The backend body is surfaced verbatim as the message.
    #[error("{0}")]
    ServerError(String),

    /// Any other non-200 status, carrying the status line (e.g. "418 I'm a teapot").
    #[error("{0}")]
    Status(String),
}

impl ApiError {
    /// Map an upstream status and body to either the response body or a typed error.
    ///
    /// Only `200` is success; every other status, including other 2xx codes,
    /// is reported as an error.
    pub fn from_status(status: u16, body: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        match status {
            200 => Ok(body),
            404 => Err(ApiError::NotFound),
            403 => Err(ApiError::AccessDenied),
            500 => Err(ApiError::ServerError(
                String::from_utf8_lossy(&body).into_owned(),
            )),
            other => Err(ApiError::Status(status_line(other))),
        }
    }
}

fn status_line(status: u16) -> String {
    match reqwest::StatusCode::from_u16(status) {
        Ok(code) => code.to_string(),
        Err(_) => status.to_string(),
    }
}
