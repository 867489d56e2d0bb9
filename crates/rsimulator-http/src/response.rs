//! Response construction for simulator replies.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use rsimulator_core::Matches;

/// Methods a template tree can answer.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";

/// Response with `status`, an optional `Content-Type` and `body`.
///
/// A content type that is not a valid header value yields a bare 500.
pub fn reply(
    status: StatusCode,
    content_type: Option<&str>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            Err(_) => return status_response(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
    response
}

/// Status-only response with the canonical reason as body.
pub fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(
        status.canonical_reason().unwrap_or_default(),
    )));
    *response.status_mut() = status;
    response
}

/// 405 listing [`ALLOWED_METHODS`].
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// Pretty JSON listing of every candidate considered for a lookup.
pub fn diagnostics_response(found: &Matches) -> Response<Full<Bytes>> {
    match serde_json::to_string_pretty(found) {
        Ok(json) => reply(StatusCode::OK, Some("application/json"), json),
        Err(e) => {
            tracing::error!("Failed to serialize diagnostics: {}", e);
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
