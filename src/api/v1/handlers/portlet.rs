/*
 * Responsibility
 * - /portlets/{window}/{phase}: HTTP リクエストを portlet リクエストに変換
 * - PortletContainer::dispatch (delegating proxy → security chain → portlet)
 * - セッション cookie の発行、PortletError → HTTP status
 */
use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Path, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::{ErrorBody, ErrorResponse};
use crate::host::http::{HttpPortletRequest, session_cookie};
use crate::portlet::phase::Phase;
use crate::portlet::request::PortletResponse;
use crate::state::AppState;

pub async fn dispatch_portlet(
    State(state): State<AppState>,
    Path((window, phase)): Path<(String, String)>,
    request: Request,
) -> Response {
    let Ok(phase) = phase.parse::<Phase>() else {
        let body = ErrorResponse {
            error: ErrorBody {
                code: "NOT_FOUND",
                message: format!("unknown lifecycle phase: {phase}"),
            },
        };
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    let (parts, _body) = request.into_parts();
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let mut portlet_request = HttpPortletRequest {
        phase,
        window_id: &window,
        headers: &parts.headers,
        remote_addr,
        preferences: state.preferences.as_ref().clone(),
        sessions: state.container.sessions().clone(),
    }
    .into_portlet_request();
    let mut portlet_response = PortletResponse::for_request(&portlet_request);

    if let Err(err) = state
        .container
        .dispatch(&mut portlet_request, &mut portlet_response)
        .await
    {
        return err.into_response();
    }
    portlet_response.commit();

    let mut response = match portlet_response.take_content() {
        Some(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };

    if let Some(cookie) = portlet_request
        .session()
        .and_then(|session| session_cookie(session.id()))
    {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    response
}
