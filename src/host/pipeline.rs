/*
 * Responsibility
 * - Config から filter bean / chain proxy / delegating proxy を組み立て
 * - delegating proxy は application context より先に init (初回リクエストで解決)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::error::PortletResult;
use crate::host::container::{Portlet, PortletContainer};
use crate::portlet::context::PortletContext;
use crate::portlet::preferences::PortletPreferences;
use crate::portlet::session::SessionStore;
use crate::security::chain::{ChainDefinition, FilterChainProxy, UniversalMatchLastValidator};
use crate::security::details::AuthenticationDetailsSource;
use crate::security::event::ApplicationEventPublisher;
use crate::security::manager::PreAuthenticatedAuthenticationManager;
use crate::security::matcher::RequestMatcher;
use crate::security::persistence::SecurityContextPersistenceFilter;
use crate::security::preauth::{
    PreAuthenticatedDetailsSource, PreAuthenticationProcessingFilter, PrimaryAttributeDetailsSource,
};
use crate::security::repository::PortletSessionSecurityContextRepository;
use crate::web::delegating::DelegatingFilterProxy;
use crate::web::registry::BeanRegistry;

pub const PERSISTENCE_FILTER_BEAN: &str = "securityContextPersistenceFilter";
pub const PRE_AUTH_FILTER_BEAN: &str = "preAuthenticationProcessingFilter";

/// Preferences the hosted portlet is deployed with.
pub fn portlet_preferences(config: &Config) -> PortletPreferences {
    PortletPreferences::new().with_values(
        config.primary_attribute_preference.clone(),
        config.primary_attributes.iter().cloned(),
    )
}

/// The application context: the filter beans plus the chain proxy that
/// orders them, registered under the name the delegating proxy targets.
pub fn build_registry(
    config: &Config,
    event_publisher: Arc<dyn ApplicationEventPublisher>,
) -> PortletResult<BeanRegistry> {
    let repository = PortletSessionSecurityContextRepository::with_config(config.session_repository.clone())?;
    let persistence = SecurityContextPersistenceFilter::with_config(Arc::new(repository), config.persistence);

    let authorities = PreAuthenticatedDetailsSource::new(config.mappable_roles.iter().cloned());
    let details_source: Arc<dyn AuthenticationDetailsSource> = if config.primary_attributes.is_empty() {
        Arc::new(authorities)
    } else {
        Arc::new(
            PrimaryAttributeDetailsSource::new(authorities)
                .with_preference(config.primary_attribute_preference.clone()),
        )
    };

    let pre_auth = PreAuthenticationProcessingFilter::builder()
        .authentication_manager(Arc::new(PreAuthenticatedAuthenticationManager::new()))
        .details_source(details_source)
        .event_publisher(event_publisher)
        .config(config.pre_auth.clone())
        .build()?;

    let mut registry = BeanRegistry::new();
    registry
        .register_filter(PERSISTENCE_FILTER_BEAN, Arc::new(persistence))
        .register_filter(PRE_AUTH_FILTER_BEAN, Arc::new(pre_auth));

    let chain_proxy = FilterChainProxy::from_definitions(
        &[ChainDefinition::new(
            RequestMatcher::AnyRequest,
            [PERSISTENCE_FILTER_BEAN, PRE_AUTH_FILTER_BEAN],
        )],
        &registry,
        Arc::new(UniversalMatchLastValidator),
    )?;
    tracing::info!(proxy = %chain_proxy, "security filter chain configured");

    let target = config
        .delegating
        .target_bean_name
        .clone()
        .unwrap_or_else(|| config.filter_name.clone());
    registry.register_filter(target, Arc::new(chain_proxy));

    Ok(registry)
}

/// Declares the delegating proxy in the container and initializes it
/// before the application context exists, so the chain is bound on first
/// request.
pub fn build_container(
    config: &Config,
    portlet: Arc<dyn Portlet>,
    sessions: Arc<dyn SessionStore>,
    event_publisher: Arc<dyn ApplicationEventPublisher>,
) -> PortletResult<PortletContainer> {
    let context = Arc::new(PortletContext::new("portlet-security"));
    let proxy = DelegatingFilterProxy::new(config.delegating.clone());
    let container = PortletContainer::new(Arc::clone(&context), Arc::new(proxy), portlet, sessions);

    container.init_filter(&config.filter_name, &[])?;
    context.set_application_context(Arc::new(build_registry(config, event_publisher)?));

    Ok(container)
}
