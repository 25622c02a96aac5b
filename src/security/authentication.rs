/*
 * Responsibility
 * - Authentication token と GrantedAuthority
 * - 永続化判定用の trust resolver (anonymous 判定)
 */
use std::fmt;

use serde::Serialize;

use crate::security::details::AuthenticationDetails;

/// A capability tag granted to a principal (e.g. `ROLE_USER`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GrantedAuthority(String);

impl GrantedAuthority {
    pub fn new(authority: impl Into<String>) -> Self {
        Self(authority.into())
    }

    pub fn authority(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrantedAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn authority_list(authorities: &[&str]) -> Vec<GrantedAuthority> {
    authorities.iter().copied().map(GrantedAuthority::new).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationKind {
    /// Identity asserted by the container or an upstream system.
    PreAuthenticated,
    /// Marker for an unauthenticated caller.
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authentication {
    kind: AuthenticationKind,
    principal: String,
    #[serde(skip_serializing)]
    credentials: Option<String>,
    authorities: Vec<GrantedAuthority>,
    details: Option<AuthenticationDetails>,
    authenticated: bool,
}

impl Authentication {
    /// Authentication request built from a pre-authenticated principal; not
    /// yet authenticated.
    pub fn pre_authenticated(principal: impl Into<String>, credentials: Option<String>) -> Self {
        Self {
            kind: AuthenticationKind::PreAuthenticated,
            principal: principal.into(),
            credentials,
            authorities: Vec::new(),
            details: None,
            authenticated: false,
        }
    }

    /// Authenticated pre-authenticated token, as returned by a manager.
    pub fn pre_authenticated_with_authorities(
        principal: impl Into<String>,
        credentials: Option<String>,
        authorities: Vec<GrantedAuthority>,
    ) -> Self {
        Self {
            authorities,
            authenticated: true,
            ..Self::pre_authenticated(principal, credentials)
        }
    }

    pub fn anonymous(principal: impl Into<String>, authorities: Vec<GrantedAuthority>) -> Self {
        Self {
            kind: AuthenticationKind::Anonymous,
            principal: principal.into(),
            credentials: None,
            authorities,
            details: None,
            authenticated: true,
        }
    }

    pub fn with_details(mut self, details: AuthenticationDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn kind(&self) -> AuthenticationKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.principal
    }

    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    pub fn authorities(&self) -> &[GrantedAuthority] {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a.authority() == authority)
    }

    pub fn details(&self) -> Option<&AuthenticationDetails> {
        self.details.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Classifies authentications for persistence decisions.
pub trait AuthenticationTrustResolver: Send + Sync + fmt::Debug {
    fn is_anonymous(&self, authentication: &Authentication) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTrustResolver;

impl AuthenticationTrustResolver for DefaultTrustResolver {
    fn is_anonymous(&self, authentication: &Authentication) -> bool {
        authentication.kind() == AuthenticationKind::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_authenticated_request_is_not_authenticated() {
        let auth = Authentication::pre_authenticated("cat", Some("N/A".into()));
        assert!(!auth.is_authenticated());
        assert_eq!(auth.name(), "cat");
        assert!(auth.authorities().is_empty());
    }

    #[test]
    fn trust_resolver_only_flags_anonymous_tokens() {
        let resolver = DefaultTrustResolver;
        let anon = Authentication::anonymous("anon", authority_list(&["ROLE_ANONYMOUS"]));
        let user = Authentication::pre_authenticated_with_authorities(
            "someone",
            None,
            authority_list(&["ROLE_A"]),
        );

        assert!(resolver.is_anonymous(&anon));
        assert!(!resolver.is_anonymous(&user));
    }

    #[test]
    fn credentials_are_never_serialized() {
        let auth = Authentication::pre_authenticated_with_authorities(
            "someone",
            Some("passwd".into()),
            authority_list(&["ROLE_A"]),
        );
        let json = serde_json::to_value(&auth).unwrap();

        assert!(json.get("credentials").is_none());
        assert_eq!(json["principal"], "someone");
        assert_eq!(json["authorities"][0], "ROLE_A");
    }
}
