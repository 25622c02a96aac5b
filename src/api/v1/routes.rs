/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health, /portlets/{window}/{phase}
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{health::health, portlet::dispatch_portlet};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/portlets/{window}/{phase}",
            get(dispatch_portlet).post(dispatch_portlet),
        )
}
