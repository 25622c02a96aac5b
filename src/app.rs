/*
 * Responsibility
 * - tracing の初期化
 * - Config読み込み → security pipeline / PortletContainer 生成 → Router 組み立て
 * - Middleware の適用 (security headers / request-id / trace / limit)
 * - axum::serve() で起動
 */
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing_subscriber::EnvFilter;

use crate::{
    api,
    config::Config,
    host::{ProfilePortlet, pipeline},
    middleware::{
        http::{self, HttpLimits},
        security_headers,
    },
    portlet::session::{MemorySessionStore, SessionStore},
    security::event::TracingEventPublisher,
    state::AppState,
};

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portlet_security=debug,tower_http=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let state = build_state(&config)?;

    let app = build_router(state);

    tracing::info!(addr = %config.addr, env = ?config.app_env, "listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

pub fn build_state(config: &Config) -> Result<AppState> {
    let sessions: Arc<dyn SessionStore> = match config.session_max_inactive {
        Some(max_inactive) => Arc::new(MemorySessionStore::with_max_inactive(max_inactive)),
        None => Arc::new(MemorySessionStore::new()),
    };
    let container = pipeline::build_container(
        config,
        Arc::new(ProfilePortlet),
        sessions,
        Arc::new(TracingEventPublisher),
    )?;

    Ok(AppState::new(
        Arc::new(container),
        pipeline::portlet_preferences(config),
    ))
}

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    let router = security_headers::apply(router);
    http::apply(router, HttpLimits::default())
}
