/*
 * Responsibility
 * - 最小構成の portlet container: 宣言された filter 1 つ + portlet 1 つ
 * - filter が対応しない phase は portlet を直接呼ぶ
 */
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PortletResult;
use crate::portlet::context::{FilterConfig, PortletContext};
use crate::portlet::dispatch;
use crate::portlet::filter::{FilterChain, PortletFilter};
use crate::portlet::phase::Phase;
use crate::portlet::request::{PortletRequest, PortletResponse};
use crate::portlet::session::SessionStore;

/// The application component at the end of the filter chain.
#[async_trait]
pub trait Portlet: Send + Sync {
    async fn handle(
        &self,
        phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
    ) -> PortletResult<()>;
}

/// The chain's terminal link: invokes the portlet.
struct PortletInvocation<'a> {
    portlet: &'a dyn Portlet,
}

#[async_trait]
impl FilterChain for PortletInvocation<'_> {
    async fn do_filter(
        &mut self,
        phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
    ) -> PortletResult<()> {
        self.portlet.handle(phase, request, response).await
    }
}

pub struct PortletContainer {
    context: Arc<PortletContext>,
    filter: Arc<dyn PortletFilter>,
    portlet: Arc<dyn Portlet>,
    sessions: Arc<dyn SessionStore>,
}

impl PortletContainer {
    pub fn new(
        context: Arc<PortletContext>,
        filter: Arc<dyn PortletFilter>,
        portlet: Arc<dyn Portlet>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            context,
            filter,
            portlet,
            sessions,
        }
    }

    /// Initializes the declared filter under `filter_name`.
    pub fn init_filter(&self, filter_name: &str, init_params: &[(&str, &str)]) -> PortletResult<()> {
        let config = init_params.iter().fold(
            FilterConfig::new(filter_name, Arc::clone(&self.context)),
            |config, (name, value)| config.with_init_param(*name, *value),
        );
        self.filter.init(&config)
    }

    pub fn context(&self) -> &Arc<PortletContext> {
        &self.context
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Runs the declared filter for the request's phase, then the portlet.
    /// Phases the filter does not cover go straight to the portlet.
    pub async fn dispatch(
        &self,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
    ) -> PortletResult<()> {
        let phase = dispatch::resolve_phase(request, response)?;
        let mut chain = PortletInvocation {
            portlet: self.portlet.as_ref(),
        };

        if self.filter.supports(phase) {
            dispatch::do_filter_with(self.filter.as_ref(), request, response, &mut chain).await
        } else {
            tracing::debug!(%phase, filter = self.filter.name(), "filter not mapped to phase");
            chain.do_filter(phase, request, response).await
        }
    }

    pub fn destroy(&self) {
        self.filter.destroy();
    }
}

impl fmt::Debug for PortletContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortletContainer")
            .field("context", &self.context.name())
            .field("filter", &self.filter.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portlet::session::MemorySessionStore;
    use crate::test_support::{CountingFilter, RenderOnlyFilter};

    struct Echo;

    #[async_trait]
    impl Portlet for Echo {
        async fn handle(
            &self,
            phase: Phase,
            _request: &mut PortletRequest,
            response: &mut PortletResponse,
        ) -> PortletResult<()> {
            response.write(phase.token());
            Ok(())
        }
    }

    fn container(filter: Arc<dyn PortletFilter>) -> PortletContainer {
        PortletContainer::new(
            Arc::new(PortletContext::new("app")),
            filter,
            Arc::new(Echo),
            Arc::new(MemorySessionStore::new()),
        )
    }

    #[tokio::test]
    async fn filter_runs_before_portlet() {
        let filter = Arc::new(CountingFilter::new("f"));
        let container = container(filter.clone());
        container.init_filter("f", &[]).unwrap();
        let mut req = PortletRequest::new(Phase::Event);
        let mut res = PortletResponse::for_request(&req);

        container.dispatch(&mut req, &mut res).await.unwrap();

        assert_eq!(filter.count(), 1);
        assert_eq!(filter.inits(), 1);
        assert_eq!(res.content(), Some("EVENT_PHASE"));
    }

    #[tokio::test]
    async fn unmapped_phase_skips_the_filter() {
        let container = container(Arc::new(RenderOnlyFilter));
        let mut req = PortletRequest::new(Phase::Action);
        let mut res = PortletResponse::for_request(&req);

        container.dispatch(&mut req, &mut res).await.unwrap();

        assert_eq!(res.content(), Some("ACTION_PHASE"));
    }
}
