/*
 * Responsibility
 * - Request-Id の生成 + 伝播 (X-Request-Id)、request span に記録してログを相関
 * - Access logging (TraceLayer)
 * - Body size limit と global timeout
 */
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Request, StatusCode, header::HeaderName};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub body_limit: usize,
    pub timeout: Duration,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            body_limit: 64 * 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

pub fn apply(router: Router, limits: HttpLimits) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(limits.body_limit))
        .layer(TimeoutLayer::new(limits.timeout))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http",
                method = %request.method(),
                uri = %request.uri(),
                request_id,
            )
        }));

    router.layer(layers)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::routing::{get, post};
    use tower::ServiceExt;

    use super::*;

    fn router() -> Router {
        apply(
            Router::new()
                .route("/ping", get(|| async { "pong" }))
                .route("/echo", post(|body: String| async move { body })),
            HttpLimits {
                body_limit: 16,
                ..HttpLimits::default()
            },
        )
    }

    #[tokio::test]
    async fn request_id_is_generated_and_echoed() {
        let res = router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn incoming_request_id_is_propagated() {
        let req = Request::get("/ping")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();

        let res = router().oneshot(req).await.unwrap();

        assert_eq!(res.headers()[REQUEST_ID_HEADER], "req-42");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let req = Request::post("/echo")
            .body(Body::from("x".repeat(64)))
            .unwrap();

        let res = router().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
