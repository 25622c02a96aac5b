/*
 * Responsibility
 * - PortletSession に security context を保存する repository
 */
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PortletError, PortletResult, SessionError};
use crate::portlet::request::PortletRequest;
use crate::portlet::session::{PortletSession, SessionAttribute, SessionScope};
use crate::security::authentication::{AuthenticationTrustResolver, DefaultTrustResolver};
use crate::security::context::{SecurityContext, same_authentication};
use crate::security::repository::{RequestResponseHolder, SecurityContextRepository};

pub const SPRING_SECURITY_CONTEXT_KEY: &str = "SPRING_SECURITY_CONTEXT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionRepositoryConfig {
    pub context_key: String,
    pub scope: SessionScope,
    pub allow_session_creation: bool,
}

impl Default for SessionRepositoryConfig {
    fn default() -> Self {
        Self {
            context_key: SPRING_SECURITY_CONTEXT_KEY.to_string(),
            scope: SessionScope::Portlet,
            allow_session_creation: true,
        }
    }
}

/// Keeps the context under one attribute key in one session scope.
///
/// Sessions are only created when there is something worth keeping: an empty
/// or anonymous context never causes one. An unchanged context is not written
/// back.
#[derive(Debug, Clone)]
pub struct PortletSessionSecurityContextRepository {
    context_key: String,
    scope: SessionScope,
    allow_session_creation: bool,
    trust_resolver: Arc<dyn AuthenticationTrustResolver>,
}

impl Default for PortletSessionSecurityContextRepository {
    fn default() -> Self {
        Self {
            context_key: SPRING_SECURITY_CONTEXT_KEY.to_string(),
            scope: SessionScope::Portlet,
            allow_session_creation: true,
            trust_resolver: Arc::new(DefaultTrustResolver),
        }
    }
}

impl PortletSessionSecurityContextRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionRepositoryConfig) -> PortletResult<Self> {
        if config.context_key.trim().is_empty() {
            return Err(PortletError::configuration(
                "security context key cannot be empty",
            ));
        }

        Ok(Self {
            context_key: config.context_key,
            scope: config.scope,
            allow_session_creation: config.allow_session_creation,
            ..Self::default()
        })
    }

    pub fn with_trust_resolver(mut self, trust_resolver: Arc<dyn AuthenticationTrustResolver>) -> Self {
        self.trust_resolver = trust_resolver;
        self
    }

    pub fn context_key(&self) -> &str {
        &self.context_key
    }

    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    fn read_from_session(&self, session: Option<&PortletSession>) -> Option<SecurityContext> {
        let Some(session) = session else {
            debug!("no portlet session currently exists");
            return None;
        };

        let Some(attribute) = session.attribute(&self.context_key, self.scope) else {
            debug!(key = %self.context_key, session = session.id(), "portlet session has no security context");
            return None;
        };

        match attribute {
            SessionAttribute::SecurityContext(context) => {
                debug!(key = %self.context_key, context = ?context, "obtained a security context from the portlet session");
                Some(context)
            }
            other => {
                warn!(
                    key = %self.context_key,
                    found = ?other,
                    "session attribute did not contain a security context; is the attribute reserved for the security context being written directly?"
                );
                None
            }
        }
    }

    fn create_session_if_allowed(
        &self,
        context: &SecurityContext,
        holder: &mut RequestResponseHolder<'_>,
    ) -> Option<Arc<PortletSession>> {
        if holder.session_existed_at_start() {
            debug!("portlet session existed at the start of the request but is gone; not creating a new one");
            return None;
        }

        if !self.allow_session_creation {
            debug!("session creation is not allowed; security context not stored for the next request");
            return None;
        }

        if *context == SecurityContext::new() {
            debug!(context = ?context, "security context is still the default empty context; not creating a session");
            return None;
        }

        debug!("creating a portlet session for a non-default security context");
        match holder.request_mut().get_or_create_session() {
            Ok(session) => Some(session),
            Err(SessionError::ResponseCommitted) => {
                warn!("failed to create a session, as the response has been committed; security context not stored");
                None
            }
            Err(err) => {
                warn!(error = %err, "failed to create a session; security context not stored");
                None
            }
        }
    }

    fn context_changed(&self, context: &SecurityContext, holder: &RequestResponseHolder<'_>) -> bool {
        let same_context = holder
            .context_before_execution()
            .is_some_and(|before| before.same_context(context));

        !same_context
            || !same_authentication(
                context.authentication().as_ref(),
                holder.auth_before_execution(),
            )
    }
}

#[async_trait]
impl SecurityContextRepository for PortletSessionSecurityContextRepository {
    async fn load_context(&self, holder: &mut RequestResponseHolder<'_>) -> SecurityContext {
        let session = holder.request().session();

        let context = self.read_from_session(session.as_deref()).unwrap_or_else(|| {
            debug!("no security context was available from the portlet session; a new one will be created");
            SecurityContext::new()
        });

        holder.auth_before_execution = context.authentication();
        holder.context_before_execution = Some(context.clone());
        holder.session_existed_at_start = session.is_some();

        context
    }

    fn save_context(&self, context: &SecurityContext, holder: &mut RequestResponseHolder<'_>) {
        let mut session = holder.request().session();

        let anonymous = match context.authentication() {
            None => true,
            Some(auth) => self.trust_resolver.is_anonymous(&auth),
        };

        if anonymous {
            debug!("security context is empty or anonymous; not storing it in the portlet session");
            if let Some(session) = session {
                session.remove_attribute(&self.context_key, self.scope);
            }
            return;
        }

        if session.is_none() {
            session = self.create_session_if_allowed(context, holder);
        }

        let Some(session) = session else {
            return;
        };

        let stored = session.attribute(&self.context_key, self.scope).is_some();
        if !stored || self.context_changed(context, holder) {
            let attribute = SessionAttribute::SecurityContext(context.clone());
            match session.set_attribute(self.context_key.clone(), attribute, self.scope) {
                Ok(()) => debug!(context = ?context, "security context stored to portlet session"),
                Err(err) => warn!(error = %err, "failed to store security context"),
            }
        }
    }

    fn contains_context(&self, request: &PortletRequest) -> bool {
        request
            .session()
            .is_some_and(|session| session.attribute(&self.context_key, self.scope).is_some())
    }
}
