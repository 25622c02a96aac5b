/*
 * Responsibility
 * - pre-authentication processing filter
 * - container が確立した identity を manager 経由で Authentication にして request に載せる
 * - principal 変更検知、失敗時の扱い (continue_on_failure)
 */
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AuthenticationError, PortletError, PortletResult};
use crate::portlet::dispatch;
use crate::portlet::filter::{FilterChain, PortletFilter};
use crate::portlet::phase::Phase;
use crate::portlet::request::{AttributeValue, PortletRequest, PortletResponse};
use crate::security::authentication::Authentication;
use crate::security::details::{AuthenticationDetailsSource, PortletAuthenticationDetailsSource};
use crate::security::event::{ApplicationEventPublisher, AuthenticationEvent};
use crate::security::manager::AuthenticationManager;

/// Request attribute holding the last authentication failure.
pub const AUTHENTICATION_EXCEPTION: &str = "SPRING_SECURITY_LAST_EXCEPTION";

/// Credentials used when the auth type is not requested.
pub const CREDENTIALS_PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreAuthConfig {
    pub continue_on_failure: bool,
    pub check_for_principal_changes: bool,
    pub invalidate_session_on_principal_change: bool,
    pub use_auth_type_as_credentials: bool,
    /// User-info attributes tried, in order, when the container supplies no
    /// remote user or principal.
    pub username_attributes: Vec<String>,
}

impl Default for PreAuthConfig {
    fn default() -> Self {
        Self {
            continue_on_failure: true,
            check_for_principal_changes: false,
            invalidate_session_on_principal_change: true,
            use_auth_type_as_credentials: false,
            username_attributes: Vec::new(),
        }
    }
}

/// What happened when the filter tried to authenticate a request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationOutcome {
    /// Nothing to do: already authenticated, or no principal in the request.
    Skipped,
    Authenticated(Arc<Authentication>),
    /// The manager rejected the principal. The context has been cleared and
    /// the error stored under [`AUTHENTICATION_EXCEPTION`].
    Failed(AuthenticationError),
}

#[derive(Debug, Clone)]
pub struct PreAuthenticationProcessingFilter {
    manager: Arc<dyn AuthenticationManager>,
    details_source: Arc<dyn AuthenticationDetailsSource>,
    event_publisher: Option<Arc<dyn ApplicationEventPublisher>>,
    config: PreAuthConfig,
}

impl PreAuthenticationProcessingFilter {
    pub fn builder() -> PreAuthenticationProcessingFilterBuilder {
        PreAuthenticationProcessingFilterBuilder::default()
    }

    pub fn config(&self) -> &PreAuthConfig {
        &self.config
    }

    pub fn details_source(&self) -> &Arc<dyn AuthenticationDetailsSource> {
        &self.details_source
    }

    /// Remote user, then the principal's name, then the configured user-info
    /// attributes. Empty values are skipped.
    pub fn pre_authenticated_principal(&self, request: &PortletRequest) -> Option<String> {
        if let Some(user) = request.remote_user().filter(|u| !u.is_empty()) {
            return Some(user.to_string());
        }

        if let Some(name) = request
            .user_principal()
            .and_then(|p| p.name())
            .filter(|n| !n.is_empty())
        {
            return Some(name.to_string());
        }

        self.config
            .username_attributes
            .iter()
            .filter_map(|attr| request.user_info_value(attr))
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn pre_authenticated_credentials(&self, request: &PortletRequest) -> Option<String> {
        if self.config.use_auth_type_as_credentials {
            return request.auth_type().map(str::to_string);
        }
        Some(CREDENTIALS_PLACEHOLDER.to_string())
    }

    fn requires_authentication(&self, request: &mut PortletRequest) -> PortletResult<bool> {
        let Some(current) = request.security().authentication() else {
            return Ok(true);
        };

        if !self.config.check_for_principal_changes {
            return Ok(false);
        }

        let principal = self.pre_authenticated_principal(request);
        if principal.as_deref() == Some(current.name()) {
            return Ok(false);
        }

        debug!(
            previous = current.name(),
            principal = ?principal,
            "pre-authenticated principal has changed and will be reauthenticated"
        );

        if self.config.invalidate_session_on_principal_change && request.session().is_some() {
            debug!("invalidating existing session");
            request.invalidate_session();
            request.get_or_create_session()?;
        }

        Ok(true)
    }

    /// Authenticates the request if needed, without continuing the chain.
    pub async fn authenticate_request(
        &self,
        request: &mut PortletRequest,
    ) -> PortletResult<AuthenticationOutcome> {
        debug!(
            current = ?request.security().authentication().map(|a| a.name().to_string()),
            "checking secure context token"
        );

        if !self.requires_authentication(request)? {
            return Ok(AuthenticationOutcome::Skipped);
        }

        let Some(principal) = self.pre_authenticated_principal(request) else {
            debug!("no pre-authenticated principal found in request");
            return Ok(AuthenticationOutcome::Skipped);
        };
        let credentials = self.pre_authenticated_credentials(request);

        debug!(principal = %principal, "trying to authenticate pre-authenticated principal");

        let details = self.details_source.build_details(request)?;
        let auth_request = Authentication::pre_authenticated(principal, credentials).with_details(details);

        match self.manager.authenticate(auth_request).await {
            Ok(result) => {
                let result = Arc::new(result);
                self.successful_authentication(request, Arc::clone(&result));
                Ok(AuthenticationOutcome::Authenticated(result))
            }
            Err(failed) => {
                self.unsuccessful_authentication(request, &failed);
                Ok(AuthenticationOutcome::Failed(failed))
            }
        }
    }

    fn successful_authentication(&self, request: &mut PortletRequest, result: Arc<Authentication>) {
        debug!(principal = result.name(), "authentication success");
        request
            .security_mut()
            .context()
            .set_authentication(Some(Arc::clone(&result)));

        if let Some(publisher) = &self.event_publisher {
            publisher.publish_event(AuthenticationEvent::interactive_success(
                result,
                std::any::type_name::<Self>(),
            ));
        }
    }

    fn unsuccessful_authentication(&self, request: &mut PortletRequest, failed: &AuthenticationError) {
        request.security_mut().clear_context();
        debug!(error = %failed, "cleared security context due to authentication failure");
        request.set_attribute(
            AUTHENTICATION_EXCEPTION,
            AttributeValue::AuthenticationError(failed.clone()),
        );
    }
}

#[async_trait]
impl PortletFilter for PreAuthenticationProcessingFilter {
    fn name(&self) -> &str {
        "PreAuthenticationProcessingFilter"
    }

    async fn do_filter(
        &self,
        _phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        if let AuthenticationOutcome::Failed(failed) = self.authenticate_request(request).await?
            && !self.config.continue_on_failure
        {
            return Err(failed.into());
        }

        dispatch::do_filter(request, response, chain).await
    }
}

#[derive(Debug, Default)]
pub struct PreAuthenticationProcessingFilterBuilder {
    manager: Option<Arc<dyn AuthenticationManager>>,
    details_source: Option<Arc<dyn AuthenticationDetailsSource>>,
    event_publisher: Option<Arc<dyn ApplicationEventPublisher>>,
    config: PreAuthConfig,
}

impl PreAuthenticationProcessingFilterBuilder {
    pub fn authentication_manager(mut self, manager: Arc<dyn AuthenticationManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn details_source(mut self, source: Arc<dyn AuthenticationDetailsSource>) -> Self {
        self.details_source = Some(source);
        self
    }

    pub fn event_publisher(mut self, publisher: Arc<dyn ApplicationEventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    pub fn config(mut self, config: PreAuthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> PortletResult<PreAuthenticationProcessingFilter> {
        let manager = self
            .manager
            .ok_or_else(|| PortletError::configuration("An AuthenticationManager must be set"))?;

        Ok(PreAuthenticationProcessingFilter {
            manager,
            details_source: self
                .details_source
                .unwrap_or_else(|| Arc::new(PortletAuthenticationDetailsSource)),
            event_publisher: self.event_publisher,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portlet::request::UserPrincipal;
    use crate::security::event::BroadcastEventPublisher;
    use crate::security::context::SecurityContext;
    use crate::test_support::{PassThroughAuthenticationManager, RecordingChain, RejectingAuthenticationManager};

    fn filter(config: PreAuthConfig) -> PreAuthenticationProcessingFilter {
        PreAuthenticationProcessingFilter::builder()
            .authentication_manager(Arc::new(PassThroughAuthenticationManager::default()))
            .config(config)
            .build()
            .unwrap()
    }

    async fn run(filter: &PreAuthenticationProcessingFilter, req: &mut PortletRequest) -> PortletResult<()> {
        let mut res = PortletResponse::for_request(req);
        filter
            .do_filter(Phase::Render, req, &mut res, &mut RecordingChain::default())
            .await
    }

    #[test]
    fn manager_is_required() {
        let err = PreAuthenticationProcessingFilter::builder().build().unwrap_err();
        assert!(matches!(err, PortletError::Configuration(_)));
    }

    #[tokio::test]
    async fn defaults_to_using_remote_user() {
        let filter = filter(PreAuthConfig::default());
        let mut req = PortletRequest::builder(Phase::Render).remote_user("cat").build();

        run(&filter, &mut req).await.unwrap();

        let auth = req.security().authentication().unwrap();
        assert_eq!(auth.name(), "cat");
        assert_eq!(auth.credentials(), Some(CREDENTIALS_PLACEHOLDER));
    }

    #[tokio::test]
    async fn falls_back_to_principal_then_user_info() {
        let filter = filter(PreAuthConfig {
            username_attributes: vec!["missing".into(), "myUsernameHeader".into()],
            ..PreAuthConfig::default()
        });

        let by_principal = PortletRequest::builder(Phase::Render)
            .user_principal(UserPrincipal::new("owl"))
            .build();
        assert_eq!(filter.pre_authenticated_principal(&by_principal).as_deref(), Some("owl"));

        let mut by_user_info = PortletRequest::builder(Phase::Render)
            .user_principal(UserPrincipal::unnamed())
            .user_info([("myUsernameHeader", "wolfman")])
            .build();
        run(&filter, &mut by_user_info).await.unwrap();
        assert_eq!(by_user_info.security().authentication().unwrap().name(), "wolfman");
    }

    #[test]
    fn empty_remote_user_is_skipped() {
        let filter = filter(PreAuthConfig::default());
        let req = PortletRequest::builder(Phase::Render)
            .remote_user("")
            .user_principal(UserPrincipal::new("owl"))
            .build();

        assert_eq!(filter.pre_authenticated_principal(&req).as_deref(), Some("owl"));
    }

    #[tokio::test]
    async fn auth_type_is_used_as_credentials_when_configured() {
        let filter = filter(PreAuthConfig {
            use_auth_type_as_credentials: true,
            ..PreAuthConfig::default()
        });
        let mut req = PortletRequest::builder(Phase::Render)
            .remote_user("cat")
            .auth_type("BASIC")
            .build();

        run(&filter, &mut req).await.unwrap();

        assert_eq!(req.security().authentication().unwrap().credentials(), Some("BASIC"));
    }

    #[tokio::test]
    async fn no_principal_skips_authentication() {
        let filter = filter(PreAuthConfig::default());
        let mut req = PortletRequest::new(Phase::Render);

        let outcome = filter.authenticate_request(&mut req).await.unwrap();

        assert_eq!(outcome, AuthenticationOutcome::Skipped);
        assert!(req.security().authentication().is_none());
    }

    #[tokio::test]
    async fn existing_authentication_is_kept_without_principal_checks() {
        let filter = filter(PreAuthConfig::default());
        let mut req = PortletRequest::builder(Phase::Render).remote_user("dog").build();
        req.security_mut().set_context(SecurityContext::with_authentication(
            Authentication::pre_authenticated_with_authorities("cat", None, Vec::new()),
        ));

        run(&filter, &mut req).await.unwrap();

        assert_eq!(req.security().authentication().unwrap().name(), "cat");
    }

    #[tokio::test]
    async fn principal_change_reauthenticates_and_renews_session() {
        let filter = filter(PreAuthConfig {
            check_for_principal_changes: true,
            ..PreAuthConfig::default()
        });
        let mut req = PortletRequest::builder(Phase::Render).remote_user("dog").build();
        let old_session = req.get_or_create_session().unwrap();
        req.security_mut().set_context(SecurityContext::with_authentication(
            Authentication::pre_authenticated_with_authorities("cat", None, Vec::new()),
        ));

        run(&filter, &mut req).await.unwrap();

        assert_eq!(req.security().authentication().unwrap().name(), "dog");
        assert!(!old_session.is_valid());
        let new_session = req.session().unwrap();
        assert_ne!(new_session.id(), old_session.id());
    }

    #[tokio::test]
    async fn failure_clears_context_and_stores_error() {
        let filter = PreAuthenticationProcessingFilter::builder()
            .authentication_manager(Arc::new(RejectingAuthenticationManager))
            .build()
            .unwrap();
        let mut req = PortletRequest::builder(Phase::Render).remote_user("cat").build();
        let mut res = PortletResponse::for_request(&req);
        let mut chain = RecordingChain::default();

        filter
            .do_filter(Phase::Render, &mut req, &mut res, &mut chain)
            .await
            .unwrap();

        assert!(req.security().is_cleared());
        assert_eq!(
            req.attribute(AUTHENTICATION_EXCEPTION),
            Some(&AttributeValue::AuthenticationError(AuthenticationError::BadCredentials))
        );
        assert_eq!(chain.calls().len(), 1);
    }

    #[tokio::test]
    async fn failure_is_raised_when_not_continuing() {
        let filter = PreAuthenticationProcessingFilter::builder()
            .authentication_manager(Arc::new(RejectingAuthenticationManager))
            .config(PreAuthConfig {
                continue_on_failure: false,
                ..PreAuthConfig::default()
            })
            .build()
            .unwrap();
        let mut req = PortletRequest::builder(Phase::Render).remote_user("cat").build();
        let mut res = PortletResponse::for_request(&req);
        let mut chain = RecordingChain::default();

        let err = filter
            .do_filter(Phase::Render, &mut req, &mut res, &mut chain)
            .await
            .unwrap_err();

        assert!(matches!(err, PortletError::Authentication(AuthenticationError::BadCredentials)));
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn success_publishes_an_event() {
        let publisher = Arc::new(BroadcastEventPublisher::new(4));
        let mut events = publisher.subscribe();
        let filter = PreAuthenticationProcessingFilter::builder()
            .authentication_manager(Arc::new(PassThroughAuthenticationManager::default()))
            .event_publisher(publisher)
            .build()
            .unwrap();
        let mut req = PortletRequest::builder(Phase::Render).remote_user("cat").build();

        run(&filter, &mut req).await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.authentication().name(), "cat");
        let AuthenticationEvent::InteractiveAuthenticationSuccess { generated_by, .. } = event;
        assert!(generated_by.ends_with("PreAuthenticationProcessingFilter"));
    }
}
