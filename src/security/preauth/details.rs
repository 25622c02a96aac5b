/*
 * Responsibility
 * - container role → GrantedAuthority の details source
 */
use serde::Deserialize;

use crate::error::PortletResult;
use crate::portlet::request::PortletRequest;
use crate::security::authentication::GrantedAuthority;
use crate::security::details::{AuthenticationDetails, AuthenticationDetailsSource};

pub const DEFAULT_ROLE_PREFIX: &str = "ROLE_";

/// Checks each mappable role against the container (`is_user_in_role`) and
/// grants the ones the user holds, prefixed with `role_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreAuthenticatedDetailsSource {
    mappable_roles: Vec<String>,
    role_prefix: String,
}

impl Default for PreAuthenticatedDetailsSource {
    fn default() -> Self {
        Self {
            mappable_roles: Vec::new(),
            role_prefix: DEFAULT_ROLE_PREFIX.to_string(),
        }
    }
}

impl PreAuthenticatedDetailsSource {
    pub fn new<I, S>(mappable_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mappable_roles: mappable_roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_role_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.role_prefix = prefix.into();
        self
    }

    pub fn mappable_roles(&self) -> &[String] {
        &self.mappable_roles
    }

    pub fn granted_authorities(&self, request: &PortletRequest) -> Vec<GrantedAuthority> {
        let mut authorities: Vec<GrantedAuthority> = Vec::new();

        for role in self.mappable_roles.iter().filter(|r| request.is_user_in_role(r)) {
            let authority = if role.starts_with(&self.role_prefix) {
                GrantedAuthority::new(role.as_str())
            } else {
                GrantedAuthority::new(format!("{}{}", self.role_prefix, role))
            };
            if !authorities.contains(&authority) {
                authorities.push(authority);
            }
        }

        tracing::debug!(?authorities, "pre-authenticated roles mapped to authorities");
        authorities
    }
}

impl AuthenticationDetailsSource for PreAuthenticatedDetailsSource {
    fn build_details(&self, request: &PortletRequest) -> PortletResult<AuthenticationDetails> {
        Ok(AuthenticationDetails::from_request(request)
            .with_authorities(self.granted_authorities(request))
            .with_user_info(request.user_info().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portlet::phase::Phase;

    #[test]
    fn only_held_roles_are_granted_with_prefix() {
        let source = PreAuthenticatedDetailsSource::new(["user", "admin", "ROLE_staff"]);
        let req = PortletRequest::builder(Phase::Render)
            .user_role("user")
            .user_role("ROLE_staff")
            .user_info([("mail", "cat@example.org")])
            .build();

        let details = source.build_details(&req).unwrap();

        let granted: Vec<&str> = details.authorities().iter().map(|a| a.authority()).collect();
        assert_eq!(granted, vec!["ROLE_user", "ROLE_staff"]);
        assert_eq!(details.user_info().unwrap().get("mail").unwrap(), "cat@example.org");
    }

    #[test]
    fn custom_prefix() {
        let source = PreAuthenticatedDetailsSource::new(["user"]).with_role_prefix("GROUP_");
        let req = PortletRequest::builder(Phase::Action).user_role("user").build();

        assert_eq!(source.granted_authorities(&req), vec![GrantedAuthority::new("GROUP_user")]);
    }
}
