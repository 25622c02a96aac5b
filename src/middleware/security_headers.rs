/*
 * Responsibility
 * - 認証済み fragment を共有キャッシュに載せない (no-store)
 * - MIME sniffing protection
 * - framing は portal と同一 origin のみ許可
 */
use axum::Router;
use axum::http::header::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

pub fn apply(router: Router) -> Router {
    router
        // Fragments carry per-principal content and session cookies
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        // Portlets are aggregated into portal pages, so same-origin framing stays allowed
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn headers_are_added_unless_the_handler_set_them() {
        let router = apply(
            Router::new()
                .route("/plain", get(|| async { "ok" }))
                .route(
                    "/cached",
                    get(|| async { ([("cache-control", "max-age=60")], "ok") }),
                ),
        );

        let res = router
            .clone()
            .oneshot(Request::get("/plain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["cache-control"], "no-store");
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        assert_eq!(res.headers()["x-frame-options"], "SAMEORIGIN");

        let res = router
            .oneshot(Request::get("/cached").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.headers()["cache-control"], "max-age=60");
    }
}
