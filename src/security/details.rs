/*
 * Responsibility
 * - AuthenticationDetails: 認証時のリクエスト情報 (remote address, session id など)
 * - AuthenticationDetailsSource
 */
use std::fmt;

use serde::Serialize;

use crate::error::PortletResult;
use crate::portlet::request::{PortletRequest, UserInfo};
use crate::security::authentication::GrantedAuthority;

/// Immutable once built. Compared by value so cached authentications can be
/// checked structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthenticationDetails {
    remote_address: Option<String>,
    session_id: Option<String>,
    authorities: Vec<GrantedAuthority>,
    primary_attribute: Option<String>,
    #[serde(skip)]
    user_info: Option<UserInfo>,
}

impl AuthenticationDetails {
    /// Records the remote address and, if a session already exists, its id.
    /// Never creates a session.
    pub fn from_request(request: &PortletRequest) -> Self {
        Self {
            remote_address: request.remote_address().map(str::to_string),
            session_id: request.session_id(),
            ..Self::default()
        }
    }

    pub fn with_authorities(mut self, authorities: Vec<GrantedAuthority>) -> Self {
        self.authorities = authorities;
        self
    }

    pub fn with_user_info(mut self, user_info: Option<UserInfo>) -> Self {
        self.user_info = user_info;
        self
    }

    pub fn with_primary_attribute(mut self, primary_attribute: impl Into<String>) -> Self {
        self.primary_attribute = Some(primary_attribute.into());
        self
    }

    pub fn remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn authorities(&self) -> &[GrantedAuthority] {
        &self.authorities
    }

    pub fn primary_attribute(&self) -> Option<&str> {
        self.primary_attribute.as_deref()
    }

    pub fn user_info(&self) -> Option<&UserInfo> {
        self.user_info.as_ref()
    }
}

/// Builds the details object attached to an authentication request.
pub trait AuthenticationDetailsSource: Send + Sync + fmt::Debug {
    fn build_details(&self, request: &PortletRequest) -> PortletResult<AuthenticationDetails>;
}

/// Remote address and session id only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortletAuthenticationDetailsSource;

impl AuthenticationDetailsSource for PortletAuthenticationDetailsSource {
    fn build_details(&self, request: &PortletRequest) -> PortletResult<AuthenticationDetails> {
        Ok(AuthenticationDetails::from_request(request))
    }
}
