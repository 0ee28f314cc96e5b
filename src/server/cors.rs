//! Origin allow-list CORS middleware.
//!
//! Entries in the configured allow-list may use `*` as a wildcard
//! segment (`https://*.example.com`). Requests without an Origin header
//! pass through untouched; disallowed origins get 403.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::warn;

use super::AppState;

pub async fn apply(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // Same-origin or non-browser client.
    let Some(origin) = origin else {
        return next.run(req).await;
    };

    if !origin_allowed(&origin, &state.config.allowed_origins) {
        warn!("CORS: rejected origin {origin}");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "origin not allowed"})),
        )
            .into_response();
    }

    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        allow_headers(resp.headers_mut(), &origin);
        return resp;
    }

    let mut resp = next.run(req).await;
    allow_headers(resp.headers_mut(), &origin);
    resp
}

fn allow_headers(headers: &mut HeaderMap, origin: &str) {
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, authorization"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("origin"));
}

fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|pattern| matches_origin(pattern, origin))
}

/// Match an origin against a pattern where `*` stands for any run of
/// characters.
fn matches_origin(pattern: &str, origin: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == origin;
    }

    let mut rest = origin;
    let mut parts = pattern.split('*').peekable();
    let mut first = true;
    while let Some(part) = parts.next() {
        let last = parts.peek().is_none();
        if first {
            match rest.strip_prefix(part) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if last {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
        first = false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let allowed = vec!["http://localhost:8081".to_string()];
        assert!(origin_allowed("http://localhost:8081", &allowed));
        assert!(!origin_allowed("http://localhost:8082", &allowed));
        assert!(!origin_allowed("https://localhost:8081", &allowed));
    }

    #[test]
    fn test_wildcard_subdomain() {
        let allowed = vec!["https://*.example.com".to_string()];
        assert!(origin_allowed("https://app.example.com", &allowed));
        assert!(origin_allowed("https://staging.app.example.com", &allowed));
        assert!(!origin_allowed("https://example.org", &allowed));
        assert!(!origin_allowed("http://app.example.com", &allowed));
    }

    #[test]
    fn test_wildcard_port() {
        let allowed = vec!["http://localhost:*".to_string()];
        assert!(origin_allowed("http://localhost:19006", &allowed));
        assert!(!origin_allowed("http://evil.com", &allowed));
    }
}
