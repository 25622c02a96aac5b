/*
 * Responsibility
 * - primary attribute: user を識別する user-info 値を 1 つ選ぶ
 * - 候補の属性名は portlet preference で優先順に指定
 * - details source / validator / primary_id
 */
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{PortletError, PortletResult};
use crate::portlet::request::PortletRequest;
use crate::security::authentication::Authentication;
use crate::security::details::{AuthenticationDetails, AuthenticationDetailsSource};
use crate::security::preauth::details::PreAuthenticatedDetailsSource;

pub const DEFAULT_PRIMARY_ATTRIBUTE_PREFERENCE: &str = "primaryAttribute";

#[derive(Debug, Clone)]
pub struct PrimaryAttributeDetailsSource {
    authorities: PreAuthenticatedDetailsSource,
    preference: String,
}

impl Default for PrimaryAttributeDetailsSource {
    fn default() -> Self {
        Self {
            authorities: PreAuthenticatedDetailsSource::default(),
            preference: DEFAULT_PRIMARY_ATTRIBUTE_PREFERENCE.to_string(),
        }
    }
}

impl PrimaryAttributeDetailsSource {
    pub fn new(authorities: PreAuthenticatedDetailsSource) -> Self {
        Self {
            authorities,
            ..Self::default()
        }
    }

    pub fn with_preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = preference.into();
        self
    }

    pub fn preference(&self) -> &str {
        &self.preference
    }

    /// The first non-empty user-info value among the attribute names listed
    /// in the preference. Access is denied if none has a value.
    pub fn primary_user_attribute(&self, request: &PortletRequest) -> PortletResult<String> {
        let candidates = request.preferences().values(&self.preference);

        for name in candidates {
            if let Some(value) = request.user_info_value(name).filter(|v| !v.is_empty()) {
                debug!(attribute = %name, value, "found primary attribute");
                return Ok(value.to_string());
            }
        }

        warn!(
            ?candidates,
            preference = %self.preference,
            "could not find a value for any of the primary attribute candidates"
        );
        Err(PortletError::access_denied(format!(
            "No primary attribute found in attributes: {candidates:?}"
        )))
    }
}

impl AuthenticationDetailsSource for PrimaryAttributeDetailsSource {
    fn build_details(&self, request: &PortletRequest) -> PortletResult<AuthenticationDetails> {
        let details = self.authorities.build_details(request)?;
        let primary = self.primary_user_attribute(request)?;
        Ok(details.with_primary_attribute(primary))
    }
}

/// Decides whether a cached authentication still fits the request.
pub trait AuthenticationValidator: Send + Sync + fmt::Debug {
    fn validate(&self, authentication: &Authentication, request: &PortletRequest) -> bool;
}

/// Valid while the request's primary attribute equals the one recorded in
/// the authentication's details.
#[derive(Debug, Clone)]
pub struct PrimaryAttributeAuthenticationValidator {
    source: Arc<PrimaryAttributeDetailsSource>,
}

impl PrimaryAttributeAuthenticationValidator {
    pub fn new(source: Arc<PrimaryAttributeDetailsSource>) -> Self {
        Self { source }
    }
}

impl AuthenticationValidator for PrimaryAttributeAuthenticationValidator {
    fn validate(&self, authentication: &Authentication, request: &PortletRequest) -> bool {
        let current = match self.source.primary_user_attribute(request) {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "primary attribute unavailable; cached authentication is not valid");
                return false;
            }
        };

        let cached = authentication.details().and_then(AuthenticationDetails::primary_attribute);
        cached == Some(current.as_str())
    }
}

/// Primary attribute of the authentication installed on `request`.
pub fn primary_id(request: &PortletRequest) -> Option<String> {
    request
        .security()
        .authentication()?
        .details()?
        .primary_attribute()
        .map(str::to_string)
}
