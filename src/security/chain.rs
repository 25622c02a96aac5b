/*
 * Responsibility
 * - SecurityFilterChain: matcher + filter 列
 * - FilterChainProxy: 最初に match した chain を virtual chain で実行
 */
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PortletError, PortletResult};
use crate::portlet::dispatch;
use crate::portlet::filter::{FilterChain, PortletFilter};
use crate::portlet::phase::Phase;
use crate::portlet::request::{PortletRequest, PortletResponse};
use crate::security::matcher::RequestMatcher;
use crate::web::registry::BeanRegistry;

/// A matcher plus the ordered filters to run when it accepts a request.
#[derive(Clone)]
pub struct SecurityFilterChain {
    matcher: RequestMatcher,
    filters: Vec<Arc<dyn PortletFilter>>,
}

impl SecurityFilterChain {
    pub fn new(matcher: RequestMatcher, filters: Vec<Arc<dyn PortletFilter>>) -> Self {
        let chain = Self { matcher, filters };
        tracing::info!(chain = %chain, "creating filter chain");
        chain
    }

    pub fn matcher(&self) -> &RequestMatcher {
        &self.matcher
    }

    pub fn filters(&self) -> &[Arc<dyn PortletFilter>] {
        &self.filters
    }

    pub fn matches(&self, request: &PortletRequest) -> bool {
        self.matcher.matches(request)
    }
}

impl fmt::Display for SecurityFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.filters.iter().map(|filter| filter.name()).collect();
        write!(f, "[ {}, {:?} ]", self.matcher, names)
    }
}

impl fmt::Debug for SecurityFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One chain declared by bean names, resolved against a [`BeanRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDefinition {
    pub matcher: RequestMatcher,
    pub filter_names: Vec<String>,
}

impl ChainDefinition {
    pub fn new<I, S>(matcher: RequestMatcher, filter_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matcher,
            filter_names: filter_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Checks a proxy's configuration at startup.
pub trait FilterChainValidator: Send + Sync + fmt::Debug {
    fn validate(&self, proxy: &FilterChainProxy) -> PortletResult<()>;
}

/// Accepts every configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFilterChainValidator;

impl FilterChainValidator for NullFilterChainValidator {
    fn validate(&self, _proxy: &FilterChainProxy) -> PortletResult<()> {
        Ok(())
    }
}

/// Rejects a universal matcher that is followed by other chains; those
/// chains could never be selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalMatchLastValidator;

impl FilterChainValidator for UniversalMatchLastValidator {
    fn validate(&self, proxy: &FilterChainProxy) -> PortletResult<()> {
        let chains = proxy.filter_chains();
        if let Some(pos) = chains.iter().position(|c| c.matcher().is_universal())
            && pos + 1 < chains.len()
        {
            return Err(PortletError::configuration(format!(
                "A universal match ({}) is defined before other chains; chain {} onwards would never be selected",
                chains[pos].matcher(),
                pos + 1
            )));
        }
        Ok(())
    }
}

/// Selects the first chain whose matcher accepts the request and runs its
/// filters ahead of the original chain. Order matters: more specific
/// matchers must precede more general ones.
pub struct FilterChainProxy {
    filter_chains: Vec<SecurityFilterChain>,
    validator: Arc<dyn FilterChainValidator>,
}

impl FilterChainProxy {
    pub fn new(filter_chains: Vec<SecurityFilterChain>) -> Self {
        Self {
            filter_chains,
            validator: Arc::new(NullFilterChainValidator),
        }
    }

    /// Builds the proxy and runs `validator` against it.
    pub fn with_validator(
        filter_chains: Vec<SecurityFilterChain>,
        validator: Arc<dyn FilterChainValidator>,
    ) -> PortletResult<Self> {
        let proxy = Self {
            filter_chains,
            validator,
        };
        proxy.validate()?;
        Ok(proxy)
    }

    /// Resolves `[(matcher, [bean-name…])…]` against `registry`.
    pub fn from_definitions(
        definitions: &[ChainDefinition],
        registry: &BeanRegistry,
        validator: Arc<dyn FilterChainValidator>,
    ) -> PortletResult<Self> {
        let chains = definitions
            .iter()
            .map(|def| {
                let filters = def
                    .filter_names
                    .iter()
                    .map(|name| registry.require_filter(name))
                    .collect::<PortletResult<Vec<_>>>()?;
                Ok(SecurityFilterChain::new(def.matcher.clone(), filters))
            })
            .collect::<PortletResult<Vec<_>>>()?;

        Self::with_validator(chains, validator)
    }

    pub fn validate(&self) -> PortletResult<()> {
        self.validator.validate(self)
    }

    pub fn filter_chains(&self) -> &[SecurityFilterChain] {
        &self.filter_chains
    }

    /// Filters of the first matching chain.
    pub fn filters_for(&self, request: &PortletRequest) -> Option<&[Arc<dyn PortletFilter>]> {
        self.filter_chains
            .iter()
            .find(|chain| chain.matches(request))
            .map(SecurityFilterChain::filters)
    }
}

impl fmt::Display for FilterChainProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterChainProxy[Filter Chains: {:?}]", self.filter_chains)
    }
}

#[async_trait]
impl PortletFilter for FilterChainProxy {
    fn name(&self) -> &str {
        "FilterChainProxy"
    }

    async fn do_filter(
        &self,
        _phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        let filters = match self.filters_for(request) {
            Some(filters) if !filters.is_empty() => filters,
            other => {
                debug!(
                    window = request.window_id(),
                    reason = if other.is_none() { "no matching filters" } else { "an empty filter list" },
                    "request has no security filters"
                );
                return dispatch::do_filter(request, response, chain).await;
            }
        };

        let mut virtual_chain = VirtualFilterChain {
            original_chain: chain,
            additional_filters: filters,
            current_position: 0,
        };
        dispatch::do_filter(request, response, &mut virtual_chain).await
    }
}

/// Walks the selected filters, handing itself to each as "next"; once the
/// end is reached the original chain proceeds.
struct VirtualFilterChain<'a> {
    original_chain: &'a mut dyn FilterChain,
    additional_filters: &'a [Arc<dyn PortletFilter>],
    current_position: usize,
}

#[async_trait]
impl FilterChain for VirtualFilterChain<'_> {
    async fn do_filter(
        &mut self,
        _phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
    ) -> PortletResult<()> {
        let size = self.additional_filters.len();

        if self.current_position == size {
            debug!(
                window = request.window_id(),
                "reached end of additional filter chain; proceeding with original chain"
            );
            return dispatch::do_filter(request, response, &mut *self.original_chain).await;
        }

        let filters = self.additional_filters;
        self.current_position += 1;
        let next_filter = &filters[self.current_position - 1];

        debug!(
            window = request.window_id(),
            position = self.current_position,
            size,
            filter = next_filter.name(),
            "firing filter in additional filter chain"
        );

        dispatch::do_filter_with(next_filter.as_ref(), request, response, self).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::portlet::phase::LIFECYCLE_PHASE;
    use crate::test_support::{CountingFilter, RecordingChain, StopFilter};

    fn render() -> (PortletRequest, PortletResponse) {
        let req = PortletRequest::new(Phase::Render);
        let res = PortletResponse::for_request(&req);
        (req, res)
    }

    #[tokio::test]
    async fn no_chains_fall_through_to_original_chain() {
        let proxy = FilterChainProxy::new(Vec::new());
        let (mut req, mut res) = render();
        let mut chain = RecordingChain::default();

        proxy
            .do_filter(Phase::Render, &mut req, &mut res, &mut chain)
            .await
            .unwrap();

        assert_eq!(chain.calls(), vec![Phase::Render]);
    }

    #[tokio::test]
    async fn empty_filter_list_falls_through() {
        let proxy = FilterChainProxy::new(vec![SecurityFilterChain::new(
            RequestMatcher::AnyRequest,
            Vec::new(),
        )]);
        let (mut req, mut res) = render();
        let mut chain = RecordingChain::default();

        proxy
            .do_filter(Phase::Render, &mut req, &mut res, &mut chain)
            .await
            .unwrap();

        assert_eq!(chain.calls().len(), 1);
    }

    #[tokio::test]
    async fn filters_run_in_order_then_original_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::new(CountingFilter::logging("first", log.clone()));
        let second = Arc::new(CountingFilter::logging("second", log.clone()));
        let proxy = FilterChainProxy::new(vec![SecurityFilterChain::new(
            RequestMatcher::AnyRequest,
            vec![first.clone(), second.clone()],
        )]);
        let (mut req, mut res) = render();
        let mut chain = RecordingChain::default();

        proxy
            .do_filter(Phase::Render, &mut req, &mut res, &mut chain)
            .await
            .unwrap();

        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
        assert_eq!(chain.calls(), vec![Phase::Render]);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn only_the_first_matching_chain_runs() {
        let specific = Arc::new(CountingFilter::new("specific"));
        let general = Arc::new(CountingFilter::new("general"));
        let proxy = FilterChainProxy::new(vec![
            SecurityFilterChain::new(RequestMatcher::Phase(Phase::Render), vec![specific.clone()]),
            SecurityFilterChain::new(RequestMatcher::AnyRequest, vec![general.clone()]),
        ]);
        let (mut req, mut res) = render();

        proxy
            .do_filter(Phase::Render, &mut req, &mut res, &mut RecordingChain::default())
            .await
            .unwrap();

        assert_eq!(specific.count(), 1);
        assert_eq!(general.count(), 0);
    }

    #[tokio::test]
    async fn a_filter_can_stop_the_chain() {
        let after = Arc::new(CountingFilter::new("after"));
        let proxy = FilterChainProxy::new(vec![SecurityFilterChain::new(
            RequestMatcher::AnyRequest,
            vec![Arc::new(StopFilter), after.clone()],
        )]);
        let (mut req, mut res) = render();
        let mut chain = RecordingChain::default();

        proxy
            .do_filter(Phase::Render, &mut req, &mut res, &mut chain)
            .await
            .unwrap();

        assert_eq!(after.count(), 0);
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_phase_attribute_fails_dispatch() {
        let proxy = FilterChainProxy::new(vec![SecurityFilterChain::new(
            RequestMatcher::AnyRequest,
            vec![Arc::new(CountingFilter::new("f"))],
        )]);
        let (mut req, mut res) = render();
        req.remove_attribute(LIFECYCLE_PHASE);

        let err = proxy
            .do_filter(Phase::Render, &mut req, &mut res, &mut RecordingChain::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PortletError::Configuration(_)));
    }

    #[test]
    fn universal_match_must_come_last() {
        let chains = vec![
            SecurityFilterChain::new(RequestMatcher::AnyRequest, Vec::new()),
            SecurityFilterChain::new(RequestMatcher::Phase(Phase::Action), Vec::new()),
        ];

        assert!(FilterChainProxy::with_validator(chains.clone(), Arc::new(UniversalMatchLastValidator)).is_err());
        assert!(FilterChainProxy::with_validator(chains, Arc::new(NullFilterChainValidator)).is_ok());
    }

    #[test]
    fn definitions_resolve_bean_names() {
        let mut registry = BeanRegistry::new();
        registry.register_filter("a", Arc::new(CountingFilter::new("a")));

        let proxy = FilterChainProxy::from_definitions(
            &[ChainDefinition::new(RequestMatcher::AnyRequest, ["a"])],
            &registry,
            Arc::new(NullFilterChainValidator),
        )
        .unwrap();
        assert_eq!(proxy.filter_chains()[0].filters().len(), 1);

        let missing = FilterChainProxy::from_definitions(
            &[ChainDefinition::new(RequestMatcher::AnyRequest, ["a", "nope"])],
            &registry,
            Arc::new(NullFilterChainValidator),
        );
        assert!(matches!(missing, Err(PortletError::Configuration(msg)) if msg.contains("nope")));
    }
}
