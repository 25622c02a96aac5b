/*
 * Responsibility
 * - HTTP リクエスト → PortletRequest 変換 (front proxy が header で identity を渡す)
 *   x-remote-user / x-auth-type / x-user-roles (カンマ区切り)
 *   x-user-info-<name>: user-info 属性 1 件ずつ (header 名なので小文字)
 * - session id は PORTLET_SESSION cookie で受け渡し
 */
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header};

use crate::portlet::phase::Phase;
use crate::portlet::preferences::PortletPreferences;
use crate::portlet::request::PortletRequest;
use crate::portlet::session::SessionStore;

pub const SESSION_COOKIE: &str = "PORTLET_SESSION";
pub const REMOTE_USER_HEADER: &str = "x-remote-user";
pub const AUTH_TYPE_HEADER: &str = "x-auth-type";
pub const USER_ROLES_HEADER: &str = "x-user-roles";
pub const USER_INFO_HEADER_PREFIX: &str = "x-user-info-";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn session_id_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(session_id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// Everything the host needs to turn an HTTP request into a portlet request.
pub struct HttpPortletRequest<'a> {
    pub phase: Phase,
    pub window_id: &'a str,
    pub headers: &'a HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    pub preferences: PortletPreferences,
    pub sessions: Arc<dyn SessionStore>,
}

impl HttpPortletRequest<'_> {
    pub fn into_portlet_request(self) -> PortletRequest {
        let headers = self.headers;
        let mut builder = PortletRequest::builder(self.phase)
            .window_id(self.window_id)
            .preferences(self.preferences)
            .session_store(Arc::clone(&self.sessions));

        if let Some(addr) = self.remote_addr {
            builder = builder.remote_addr(addr.ip().to_string());
        }
        if let Some(user) = header_str(headers, REMOTE_USER_HEADER) {
            builder = builder.remote_user(user);
        }
        if let Some(auth_type) = header_str(headers, AUTH_TYPE_HEADER) {
            builder = builder.auth_type(auth_type);
        }
        if let Some(roles) = header_str(headers, USER_ROLES_HEADER) {
            for role in roles.split(',').map(str::trim).filter(|r| !r.is_empty()) {
                builder = builder.user_role(role);
            }
        }

        let user_info: Vec<(String, String)> = headers
            .iter()
            .filter_map(|(name, value)| {
                let attr = name.as_str().strip_prefix(USER_INFO_HEADER_PREFIX)?;
                Some((attr.to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        if !user_info.is_empty() {
            builder = builder.user_info(user_info);
        }

        if let Some(session) = session_id_from_cookies(headers).and_then(|id| self.sessions.find(&id)) {
            session.touch();
            builder = builder.session(session);
        }

        builder.build()
    }
}
