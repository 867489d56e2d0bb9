//! Request handling: maps an HTTP request onto a simulator lookup.
//!
//! The URL path below `/` selects the template subdirectory, the
//! `Content-Type` header selects the content type (`json`, `xml`, otherwise
//! `txt`) and the body is the request document.

use std::path::{Component, Path};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderMap, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use rsimulator_core::Simulator;
use tracing::{debug, error};

use crate::response::{diagnostics_response, method_not_allowed, reply, status_response};

/// Request header asking for a listing of all candidates instead of a reply.
pub const DEBUG_HEADER: &str = "x-rsimulator-debug";

/// Shared state for request handlers
pub struct AppState {
    pub simulator: Simulator,
    /// Honour [`DEBUG_HEADER`]
    pub diagnostics: bool,
}

impl AppState {
    pub fn new(simulator: Simulator, diagnostics: bool) -> Self {
        Self {
            simulator,
            diagnostics,
        }
    }
}

/// hyper service entry point
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    debug!("{} {}", parts.method, parts.uri.path());

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            return Ok(status_response(StatusCode::BAD_REQUEST));
        }
    };

    Ok(respond(state, &parts.method, parts.uri.path(), &parts.headers, body).await)
}

/// Answer one request.
pub async fn respond(
    state: Arc<AppState>,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    if !matches!(
        *method,
        Method::GET | Method::POST | Method::PUT | Method::DELETE
    ) {
        return method_not_allowed();
    }

    let Some(relative_path) = relative_path(path) else {
        debug!("Rejected path {}", path);
        return status_response(StatusCode::NOT_FOUND);
    };

    let header = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let content_type = content_type(header);
    let request = match decode_body(header, body) {
        Ok(request) => request,
        Err(status) => return status_response(status),
    };

    let wants_debug = state.diagnostics
        && headers
            .get(DEBUG_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

    if wants_debug {
        let lookup = tokio::task::spawn_blocking(move || {
            state
                .simulator
                .diagnose(&relative_path, &request, content_type)
        })
        .await;
        return match lookup {
            Ok(Ok(found)) => diagnostics_response(&found),
            Ok(Err(e)) => internal_error(&e),
            Err(e) => internal_error(&e),
        };
    }

    let lookup = tokio::task::spawn_blocking(move || {
        state
            .simulator
            .service(&relative_path, &request, content_type)
    })
    .await;

    match lookup {
        Ok(Ok(Some(found))) => reply(StatusCode::OK, Some(mime_type(content_type)), found.body),
        Ok(Ok(None)) => reply(StatusCode::NOT_FOUND, None, Bytes::new()),
        Ok(Err(e)) => internal_error(&e),
        Err(e) => internal_error(&e),
    }
}

fn internal_error(e: &dyn std::fmt::Display) -> Response<Full<Bytes>> {
    error!("Lookup failed: {}", e);
    status_response(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Percent-decoded path without the leading `/`. `None` if it cannot be
/// decoded or climbs out of the template directory.
pub fn relative_path(path: &str) -> Option<String> {
    let decoded = urlencoding::decode(path).ok()?;
    let relative = decoded.trim_start_matches('/');
    let escapes = Path::new(relative)
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if escapes {
        return None;
    }
    Some(relative.to_string())
}

/// Template content type for a `Content-Type` header value.
pub fn content_type(header: &str) -> &'static str {
    if header.contains("json") {
        "json"
    } else if header.contains("xml") {
        "xml"
    } else {
        "txt"
    }
}

/// Value of the `charset` parameter, lowercased. Defaults to `utf-8`.
pub fn charset(header: &str) -> String {
    header
        .split(';')
        .skip(1)
        .filter_map(|parameter| parameter.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
        .unwrap_or_else(|| "utf-8".to_string())
}

fn decode_body(header: &str, body: Bytes) -> Result<String, StatusCode> {
    let charset = charset(header);
    let ascii_only = match charset.as_str() {
        "utf-8" | "utf8" => false,
        "us-ascii" | "ascii" => true,
        other => {
            debug!("Unsupported charset {}", other);
            return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        }
    };

    let request = String::from_utf8(body.to_vec()).map_err(|_| StatusCode::BAD_REQUEST)?;
    if ascii_only && !request.is_ascii() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(request)
}

fn mime_type(content_type: &str) -> &'static str {
    match content_type {
        "json" => "application/json",
        "xml" => "application/xml",
        _ => "text/plain; charset=utf-8",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, ALLOW};
    use std::fs;
    use tempfile::TempDir;

    fn templates() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("json")).unwrap();
        fs::write(dir.path().join("json/1_Request.json"), "{\"foo\": \"(.*)\"}").unwrap();
        fs::write(dir.path().join("json/1_Response.json"), "{\"bar\": \"${1}\"}").unwrap();
        fs::write(dir.path().join("echoRequest.txt"), "(.*)").unwrap();
        fs::write(dir.path().join("echoResponse.txt"), "echo ${1}").unwrap();
        dir
    }

    fn state(dir: &TempDir, diagnostics: bool) -> Arc<AppState> {
        Arc::new(AppState::new(
            Simulator::builder(dir.path()).build(),
            diagnostics,
        ))
    }

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("application/json"), "json");
        assert_eq!(content_type("application/soap+xml; charset=utf-8"), "xml");
        assert_eq!(content_type("text/plain"), "txt");
        assert_eq!(content_type(""), "txt");
    }

    #[test]
    fn test_charset() {
        assert_eq!(charset("application/json"), "utf-8");
        assert_eq!(charset("text/plain; charset=ISO-8859-1"), "iso-8859-1");
        assert_eq!(charset("text/xml; boundary=x; charset=\"UTF-8\""), "utf-8");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("/json"), Some("json".to_string()));
        assert_eq!(relative_path("/"), Some(String::new()));
        assert_eq!(relative_path("/a%20b/c"), Some("a b/c".to_string()));
        assert_eq!(relative_path("/../etc"), None);
        assert_eq!(relative_path("/a/%2E%2E/b"), None);
        assert_eq!(relative_path("//json"), Some("json".to_string()));
        assert_eq!(relative_path("/%2Fjson"), Some("json".to_string()));
        assert_eq!(relative_path("/./json"), None);
    }

    #[tokio::test]
    async fn test_json_match() {
        let dir = templates();
        let response = respond(
            state(&dir, false),
            &Method::POST,
            "/json",
            &headers("application/json"),
            Bytes::from(r#"{"foo": "Hello World!"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(body_text(response).await, r#"{"bar": "Hello World!"}"#);
    }

    #[tokio::test]
    async fn test_default_content_type_is_text() {
        let dir = templates();
        let response = respond(
            state(&dir, false),
            &Method::GET,
            "/",
            &HeaderMap::new(),
            Bytes::from("hi"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "echo hi");
    }

    #[tokio::test]
    async fn test_no_match_is_404_without_details() {
        let dir = templates();
        let response = respond(
            state(&dir, false),
            &Method::POST,
            "/json",
            &headers("application/json"),
            Bytes::from(r#"{"other": 1}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let dir = templates();
        let response = respond(
            state(&dir, false),
            &Method::PATCH,
            "/json",
            &HeaderMap::new(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(ALLOW));
    }

    #[tokio::test]
    async fn test_unsupported_charset() {
        let dir = templates();
        let response = respond(
            state(&dir, false),
            &Method::POST,
            "/",
            &headers("text/plain; charset=utf-16"),
            Bytes::from("hi"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_invalid_utf8_body() {
        let dir = templates();
        let response = respond(
            state(&dir, false),
            &Method::POST,
            "/",
            &HeaderMap::new(),
            Bytes::from_static(&[0xff, 0xfe]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let dir = templates();
        let response = respond(
            state(&dir, false),
            &Method::GET,
            "/../json",
            &HeaderMap::new(),
            Bytes::from("hi"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_absolute_path_stays_inside_root() {
        let dir = templates();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secretRequest.txt"), "(.*)").unwrap();
        fs::write(outside.path().join("secretResponse.txt"), "SECRET").unwrap();

        let absolute = outside.path().to_string_lossy().into_owned();
        let encoded = absolute.replacen('/', "%2F", 1);
        for path in [format!("/{absolute}"), format!("/{encoded}")] {
            let response = respond(
                state(&dir, false),
                &Method::POST,
                &path,
                &HeaderMap::new(),
                Bytes::from("hi"),
            )
            .await;

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }

    #[tokio::test]
    async fn test_diagnostics_lists_candidates() {
        let dir = templates();
        let mut request_headers = headers("application/json");
        request_headers.insert(DEBUG_HEADER, HeaderValue::from_static("true"));

        let response = respond(
            state(&dir, true),
            &Method::POST,
            "/json",
            &request_headers,
            Bytes::from(r#"{"other": 1}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let listing: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(listing["matches"].as_array().unwrap().len(), 0);
        assert_eq!(
            listing["no_matches"][0]["error"]["message"],
            r#"Keys not matching: "foo""#
        );
    }

    #[tokio::test]
    async fn test_debug_header_ignored_when_diagnostics_disabled() {
        let dir = templates();
        let mut request_headers = headers("application/json");
        request_headers.insert(DEBUG_HEADER, HeaderValue::from_static("true"));

        let response = respond(
            state(&dir, false),
            &Method::POST,
            "/json",
            &request_headers,
            Bytes::from(r#"{"other": 1}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
