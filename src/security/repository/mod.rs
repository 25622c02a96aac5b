/*
 * Responsibility
 * - SecurityContextRepository: chain の前に load、後に save
 * - RequestResponseHolder: request/response と変更検知用の load 時 snapshot
 */
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::portlet::request::{PortletRequest, PortletResponse};
use crate::security::authentication::Authentication;
use crate::security::context::SecurityContext;

pub mod null;
pub mod session;

pub use null::NullSecurityContextRepository;
pub use session::{
    PortletSessionSecurityContextRepository, SPRING_SECURITY_CONTEXT_KEY, SessionRepositoryConfig,
};

/// The request/response pair for one pass through the persistence filter,
/// and what the repository saw when it loaded the context.
pub struct RequestResponseHolder<'a> {
    request: &'a mut PortletRequest,
    response: &'a mut PortletResponse,
    pub(crate) session_existed_at_start: bool,
    pub(crate) context_before_execution: Option<SecurityContext>,
    pub(crate) auth_before_execution: Option<Arc<Authentication>>,
}

impl<'a> RequestResponseHolder<'a> {
    pub fn new(request: &'a mut PortletRequest, response: &'a mut PortletResponse) -> Self {
        Self {
            request,
            response,
            session_existed_at_start: false,
            context_before_execution: None,
            auth_before_execution: None,
        }
    }

    pub fn request(&self) -> &PortletRequest {
        &*self.request
    }

    pub fn request_mut(&mut self) -> &mut PortletRequest {
        &mut *self.request
    }

    pub fn response(&self) -> &PortletResponse {
        &*self.response
    }

    /// Both halves at once, for forwarding down the chain.
    pub fn parts(&mut self) -> (&mut PortletRequest, &mut PortletResponse) {
        (&mut *self.request, &mut *self.response)
    }

    pub fn session_existed_at_start(&self) -> bool {
        self.session_existed_at_start
    }

    pub fn context_before_execution(&self) -> Option<&SecurityContext> {
        self.context_before_execution.as_ref()
    }

    pub fn auth_before_execution(&self) -> Option<&Arc<Authentication>> {
        self.auth_before_execution.as_ref()
    }
}

impl fmt::Debug for RequestResponseHolder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestResponseHolder")
            .field("window", &self.request.window_id())
            .field("session_existed_at_start", &self.session_existed_at_start)
            .field("context_before_execution", &self.context_before_execution)
            .finish()
    }
}

/// Persists the security context between requests.
#[async_trait]
pub trait SecurityContextRepository: Send + Sync + fmt::Debug {
    /// The context for this request; a fresh empty one if nothing is stored.
    async fn load_context(&self, holder: &mut RequestResponseHolder<'_>) -> SecurityContext;

    /// Stores `context` at the end of the request. Synchronous: it also runs
    /// when the request future is dropped or unwinds.
    fn save_context(&self, context: &SecurityContext, holder: &mut RequestResponseHolder<'_>);

    fn contains_context(&self, request: &PortletRequest) -> bool;
}
