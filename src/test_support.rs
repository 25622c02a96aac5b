/*
 * Responsibility
 * - unit test 共通の test double (chain / filter / manager / repository)
 */
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AuthenticationError, PortletResult};
use crate::portlet::context::FilterConfig;
use crate::portlet::dispatch;
use crate::portlet::filter::{FilterChain, PortletFilter};
use crate::portlet::phase::Phase;
use crate::portlet::request::{PortletRequest, PortletResponse};
use crate::security::authentication::Authentication;
use crate::security::context::SecurityContext;
use crate::security::manager::AuthenticationManager;
use crate::security::repository::{RequestResponseHolder, SecurityContextRepository};

type ChainAction = Box<dyn Fn(&mut PortletRequest) -> PortletResult<()> + Send + Sync>;

/// Terminal chain that records each call and the authentication it saw.
#[derive(Default)]
pub struct RecordingChain {
    calls: Vec<Phase>,
    authentications: Vec<Option<String>>,
    action: Option<ChainAction>,
}

impl std::fmt::Debug for RecordingChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingChain")
            .field("calls", &self.calls)
            .field("authentications", &self.authentications)
            .field("action", &self.action.is_some())
            .finish()
    }
}

impl RecordingChain {
    /// Runs `action` against the request when the chain is reached.
    pub fn with_action<F>(action: F) -> Self
    where
        F: Fn(&mut PortletRequest) -> PortletResult<()> + Send + Sync + 'static,
    {
        Self {
            action: Some(Box::new(action)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Phase> {
        self.calls.clone()
    }

    pub fn authentications(&self) -> Vec<Option<String>> {
        self.authentications.clone()
    }
}

#[async_trait]
impl FilterChain for RecordingChain {
    async fn do_filter(
        &mut self,
        phase: Phase,
        request: &mut PortletRequest,
        _response: &mut PortletResponse,
    ) -> PortletResult<()> {
        self.calls.push(phase);
        self.authentications
            .push(request.security().authentication().map(|a| a.name().to_string()));

        match &self.action {
            Some(action) => action(request),
            None => Ok(()),
        }
    }
}

/// Handles the render phase only.
pub struct RenderOnlyFilter;

#[async_trait]
impl PortletFilter for RenderOnlyFilter {
    fn name(&self) -> &str {
        "RenderOnlyFilter"
    }

    fn supports(&self, phase: Phase) -> bool {
        phase == Phase::Render
    }

    async fn do_filter(
        &self,
        _phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        dispatch::do_filter(request, response, chain).await
    }
}

/// Counts requests and lifecycle calls, then continues the chain.
pub struct CountingFilter {
    name: String,
    count: AtomicUsize,
    inits: AtomicUsize,
    destroys: AtomicUsize,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl CountingFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: AtomicUsize::new(0),
            inits: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            log: None,
        }
    }

    /// Also appends its name to `log` on every request.
    pub fn logging(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            log: Some(log),
            ..Self::new(name)
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortletFilter for CountingFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, _config: &FilterConfig) -> PortletResult<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn do_filter(
        &self,
        _phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.name.clone());
        }
        dispatch::do_filter(request, response, chain).await
    }

    fn destroy(&self) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Ends processing without continuing the chain.
pub struct StopFilter;

#[async_trait]
impl PortletFilter for StopFilter {
    async fn do_filter(
        &self,
        _phase: Phase,
        _request: &mut PortletRequest,
        _response: &mut PortletResponse,
        _chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        Ok(())
    }
}

/// Authenticates whatever it is given.
#[derive(Debug, Default)]
pub struct PassThroughAuthenticationManager {
    calls: AtomicUsize,
}

impl PassThroughAuthenticationManager {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthenticationManager for PassThroughAuthenticationManager {
    async fn authenticate(
        &self,
        authentication: Authentication,
    ) -> Result<Authentication, AuthenticationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let authorities = authentication
            .details()
            .map(|d| d.authorities().to_vec())
            .unwrap_or_default();
        let mut result = Authentication::pre_authenticated_with_authorities(
            authentication.name(),
            authentication.credentials().map(str::to_string),
            authorities,
        );
        if let Some(details) = authentication.details() {
            result = result.with_details(details.clone());
        }
        Ok(result)
    }
}

#[derive(Debug)]
pub struct RejectingAuthenticationManager;

#[async_trait]
impl AuthenticationManager for RejectingAuthenticationManager {
    async fn authenticate(
        &self,
        _authentication: Authentication,
    ) -> Result<Authentication, AuthenticationError> {
        Err(AuthenticationError::BadCredentials)
    }
}

/// Returns a fixed context and records every save.
#[derive(Debug, Default)]
pub struct RecordingRepository {
    context: SecurityContext,
    loads: AtomicUsize,
    saved: Mutex<Vec<SecurityContext>>,
}

impl RecordingRepository {
    pub fn returning(context: SecurityContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<SecurityContext> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecurityContextRepository for RecordingRepository {
    async fn load_context(&self, _holder: &mut RequestResponseHolder<'_>) -> SecurityContext {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.context.clone()
    }

    fn save_context(&self, context: &SecurityContext, _holder: &mut RequestResponseHolder<'_>) {
        self.saved.lock().unwrap().push(context.clone());
    }

    fn contains_context(&self, _request: &PortletRequest) -> bool {
        !self.saved.lock().unwrap().is_empty()
    }
}
