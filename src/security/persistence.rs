/*
 * Responsibility
 * - chain の前に security context を load、後に save
 * - exit 処理 (save / sentinel 除去) は drop guard で実行: cancel / panic でも走る
 * - 同一リクエスト内の再入は sentinel 属性で素通し
 */
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PortletResult;
use crate::portlet::dispatch;
use crate::portlet::filter::{FilterChain, PortletFilter};
use crate::portlet::phase::Phase;
use crate::portlet::request::{AttributeValue, PortletRequest, PortletResponse};
use crate::security::repository::{
    PortletSessionSecurityContextRepository, RequestResponseHolder, SecurityContextRepository,
};

/// Per-request sentinel marking that the filter is already active.
pub const FILTER_APPLIED: &str = "__spring_security_pscpf_applied";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistenceFilterConfig {
    /// Create the session before the chain runs, whatever the outcome.
    pub force_eager_session_creation: bool,
}

/// Installs the repository's context on the request for the duration of the
/// chain. On the way out, whether the chain succeeded or not, the context is
/// removed from the request first and only then handed back to the
/// repository.
///
/// A request that re-enters the filter (nested dispatch) is forwarded
/// untouched.
#[derive(Debug, Clone)]
pub struct SecurityContextPersistenceFilter {
    repository: Arc<dyn SecurityContextRepository>,
    force_eager_session_creation: bool,
}

impl Default for SecurityContextPersistenceFilter {
    fn default() -> Self {
        Self::new(Arc::new(PortletSessionSecurityContextRepository::new()))
    }
}

impl SecurityContextPersistenceFilter {
    pub fn new(repository: Arc<dyn SecurityContextRepository>) -> Self {
        Self {
            repository,
            force_eager_session_creation: false,
        }
    }

    pub fn with_config(repository: Arc<dyn SecurityContextRepository>, config: PersistenceFilterConfig) -> Self {
        Self {
            repository,
            force_eager_session_creation: config.force_eager_session_creation,
        }
    }

    pub fn repository(&self) -> &Arc<dyn SecurityContextRepository> {
        &self.repository
    }

    async fn do_security_filter(
        &self,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        if request.attribute(FILTER_APPLIED).is_some() {
            return dispatch::do_filter(request, response, chain).await;
        }

        request.set_attribute(FILTER_APPLIED, AttributeValue::Flag(true));

        if self.force_eager_session_creation {
            match request.get_or_create_session() {
                Ok(session) if session.is_new() => {
                    debug!(session = session.id(), "eagerly created session");
                }
                Ok(_) => {}
                Err(err) => {
                    request.remove_attribute(FILTER_APPLIED);
                    return Err(err.into());
                }
            }
        }

        let mut exit = ExitGuard {
            holder: RequestResponseHolder::new(request, response),
            repository: self.repository.as_ref(),
            loaded: false,
            completed: false,
        };
        let context_before = self.repository.load_context(&mut exit.holder).await;
        exit.loaded = true;

        if let Some(previous) = exit.holder.request_mut().security_mut().set_context(context_before) {
            debug!(previous = ?previous, "replacing a security context already installed on the request");
        }

        let result = {
            let (request, response) = exit.holder.parts();
            dispatch::do_filter(request, response, chain).await
        };
        exit.completed = true;

        result
    }
}

/// Exit half of the filter. Runs on drop, so a request whose future is
/// cancelled or unwinds still gets its context taken off the request, saved
/// and its sentinel removed. Nothing is saved unless the load finished.
struct ExitGuard<'r, 'a> {
    holder: RequestResponseHolder<'a>,
    repository: &'r dyn SecurityContextRepository,
    loaded: bool,
    completed: bool,
}

impl Drop for ExitGuard<'_, '_> {
    fn drop(&mut self) {
        if self.loaded {
            if !self.completed {
                warn!(
                    panicking = std::thread::panicking(),
                    "request processing did not complete; saving security context on exit"
                );
            }

            let context_after = self
                .holder
                .request_mut()
                .security_mut()
                .take_context()
                .unwrap_or_default();
            self.repository.save_context(&context_after, &mut self.holder);
            debug!("security context cleared from request");
        }

        self.holder.request_mut().remove_attribute(FILTER_APPLIED);
    }
}

#[async_trait]
impl PortletFilter for SecurityContextPersistenceFilter {
    fn name(&self) -> &str {
        "SecurityContextPersistenceFilter"
    }

    async fn do_filter(
        &self,
        _phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        self.do_security_filter(request, response, chain).await
    }
}
