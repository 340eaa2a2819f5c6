//! Origin allow-listing for the WebSocket endpoint and CORS
//!
//! Browsers always send `Origin` on a WebSocket upgrade, but CORS does not
//! apply to upgrades, so the check is done here. An empty allow-list accepts
//! every origin.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn is_permissive(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Requests without an Origin header (non-browser clients) pass
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            _ if self.is_permissive() => true,
            None => true,
            Some(origin) => {
                let origin = origin.trim_end_matches('/');
                self.allowed.iter().any(|a| a == origin)
            }
        }
    }

    /// CORS layer for the plain HTTP routes
    pub fn cors_layer(&self) -> CorsLayer {
        if self.is_permissive() {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = self
            .allowed
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = o.as_str(), "Ignoring unparseable allowed origin");
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
}

/// Reject WebSocket upgrades from origins outside the allow-list
pub async fn ws_origin_middleware(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    if !policy.allows(origin) {
        tracing::warn!(origin = ?origin, "Blocked WebSocket upgrade from disallowed origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(policy: OriginPolicy) -> Router {
        Router::new()
            .route("/ws", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                Arc::new(policy),
                ws_origin_middleware,
            ))
    }

    fn request(origin: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/ws");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_empty_list_is_permissive() {
        let policy = OriginPolicy::new(vec![]);
        assert!(policy.is_permissive());
        assert!(policy.allows(Some("https://anywhere.example")));
        assert!(policy.allows(None));
    }

    #[test]
    fn test_allow_list_matching() {
        let policy = OriginPolicy::new(vec![
            "https://superflawed.example/".to_string(),
            " ".to_string(),
        ]);
        assert!(!policy.is_permissive());
        assert!(policy.allows(Some("https://superflawed.example")));
        assert!(policy.allows(Some("https://superflawed.example/")));
        assert!(!policy.allows(Some("https://evil.example")));
        assert!(policy.allows(None));
    }

    #[tokio::test]
    async fn test_middleware_blocks_disallowed_origin() {
        let policy = OriginPolicy::new(vec!["https://superflawed.example".to_string()]);

        let response = app(policy.clone())
            .oneshot(request(Some("https://evil.example")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app(policy)
            .oneshot(request(Some("https://superflawed.example")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
