/*
 * Responsibility
 * - AuthenticationManager trait
 * - pre-authenticated token 用の manager
 */
use std::fmt;

use async_trait::async_trait;

use crate::error::AuthenticationError;
use crate::security::authentication::{Authentication, AuthenticationKind};

/// Authorizes an authentication request, returning the authenticated token.
#[async_trait]
pub trait AuthenticationManager: Send + Sync + fmt::Debug {
    async fn authenticate(
        &self,
        authentication: Authentication,
    ) -> Result<Authentication, AuthenticationError>;
}

/// Accepts pre-authenticated tokens. The identity has already been
/// established upstream, so the only checks are that a principal and
/// credentials are present. Authorities come from the request details.
#[derive(Debug, Clone, Default)]
pub struct PreAuthenticatedAuthenticationManager {
    disabled_principals: Vec<String>,
}

impl PreAuthenticatedAuthenticationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Principals rejected with [`AuthenticationError::Disabled`].
    pub fn with_disabled_principals<I, S>(mut self, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_principals = principals.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl AuthenticationManager for PreAuthenticatedAuthenticationManager {
    async fn authenticate(
        &self,
        authentication: Authentication,
    ) -> Result<Authentication, AuthenticationError> {
        if authentication.kind() != AuthenticationKind::PreAuthenticated {
            return Err(AuthenticationError::ProviderNotFound("non pre-authenticated tokens"));
        }

        let principal = authentication.name();
        if principal.is_empty() {
            return Err(AuthenticationError::UsernameNotFound(principal.to_string()));
        }

        let Some(credentials) = authentication.credentials() else {
            tracing::debug!(principal, "no pre-authenticated credentials found in request");
            return Err(AuthenticationError::PreAuthenticatedCredentialsNotFound);
        };

        if self.disabled_principals.iter().any(|p| p == principal) {
            return Err(AuthenticationError::Disabled(principal.to_string()));
        }

        let authorities = authentication
            .details()
            .map(|d| d.authorities().to_vec())
            .unwrap_or_default();

        let mut result = Authentication::pre_authenticated_with_authorities(
            principal,
            Some(credentials.to_string()),
            authorities,
        );
        if let Some(details) = authentication.details() {
            result = result.with_details(details.clone());
        }

        tracing::debug!(principal, "pre-authenticated principal accepted");
        Ok(result)
    }
}
