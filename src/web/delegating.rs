/*
 * Responsibility
 * - container が宣言する filter。全リクエストを名前で引いた filter bean に委譲
 * - application context が init 時になければ初回リクエストで解決
 * - targetFilterLifecycle 指定時は init / destroy も委譲
 */
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PortletError, PortletResult};
use crate::portlet::context::FilterConfig;
use crate::portlet::filter::{FilterChain, PortletFilter};
use crate::portlet::phase::Phase;
use crate::portlet::request::{PortletRequest, PortletResponse};

/// Init parameter naming the target bean.
pub const TARGET_BEAN_NAME: &str = "targetBeanName";
/// Init parameter enabling `init`/`destroy` pass-through to the target.
pub const TARGET_FILTER_LIFECYCLE: &str = "targetFilterLifecycle";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DelegatingProxyConfig {
    /// Defaults to the filter's own name.
    pub target_bean_name: Option<String>,
    pub target_filter_lifecycle: bool,
}

impl DelegatingProxyConfig {
    pub fn from_filter_config(config: &FilterConfig) -> PortletResult<Self> {
        Self::default().with_init_params(config)
    }

    /// Overrides fields with the filter's init parameters, where present.
    pub fn with_init_params(mut self, config: &FilterConfig) -> PortletResult<Self> {
        if let Some(name) = config.init_param(TARGET_BEAN_NAME).map(str::trim)
            && !name.is_empty()
        {
            self.target_bean_name = Some(name.to_string());
        }

        if let Some(raw) = config.init_param(TARGET_FILTER_LIFECYCLE) {
            self.target_filter_lifecycle = raw.trim().parse().map_err(|_| {
                PortletError::configuration(format!(
                    "init parameter '{TARGET_FILTER_LIFECYCLE}' of filter '{}' must be true or false, got '{raw}'",
                    config.filter_name()
                ))
            })?;
        }

        Ok(self)
    }
}

#[derive(Debug)]
struct Initialized {
    target_bean_name: String,
    target_filter_lifecycle: bool,
    filter_config: FilterConfig,
}

/// Proxy for a filter bean.
///
/// Resolution runs at most once: concurrent first requests serialize on a
/// lock, and once the delegate is bound it is read without locking.
#[derive(Debug, Default)]
pub struct DelegatingFilterProxy {
    config: DelegatingProxyConfig,
    initialized: OnceLock<Initialized>,
    delegate: OnceLock<Arc<dyn PortletFilter>>,
    resolve_lock: Mutex<()>,
}

impl DelegatingFilterProxy {
    pub fn new(config: DelegatingProxyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// A proxy already bound to `delegate`; no lookup happens.
    pub fn with_delegate(delegate: Arc<dyn PortletFilter>) -> Self {
        let proxy = Self::default();
        let _ = proxy.delegate.set(delegate);
        proxy
    }

    pub fn target_bean_name(&self) -> Option<&str> {
        self.initialized
            .get()
            .map(|init| init.target_bean_name.as_str())
            .or(self.config.target_bean_name.as_deref())
    }

    pub fn is_target_filter_lifecycle(&self) -> bool {
        self.initialized
            .get()
            .map_or(self.config.target_filter_lifecycle, |init| init.target_filter_lifecycle)
    }

    pub fn delegate(&self) -> Option<&Arc<dyn PortletFilter>> {
        self.delegate.get()
    }

    fn filter_name(&self) -> &str {
        self.initialized
            .get()
            .map_or("DelegatingFilterProxy", |init| init.filter_config.filter_name())
    }

    /// Binds the delegate if it is not bound yet. With `require` unset, a
    /// missing application context is not an error and nothing is bound.
    fn init_delegate(&self, require: bool) -> PortletResult<Option<Arc<dyn PortletFilter>>> {
        if let Some(delegate) = self.delegate.get() {
            return Ok(Some(Arc::clone(delegate)));
        }

        let _guard = self.resolve_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(delegate) = self.delegate.get() {
            return Ok(Some(Arc::clone(delegate)));
        }

        let Some(init) = self.initialized.get() else {
            return if require {
                Err(PortletError::configuration(
                    "DelegatingFilterProxy has not been initialized by the container",
                ))
            } else {
                Ok(None)
            };
        };

        let Some(registry) = init.filter_config.portlet_context().application_context() else {
            if require {
                return Err(PortletError::configuration(format!(
                    "No application context found for portlet context '{}': no bean registry attached?",
                    init.filter_config.portlet_context().name()
                )));
            }
            debug!(
                filter = init.filter_config.filter_name(),
                "application context not available yet; delegate will be resolved on first request"
            );
            return Ok(None);
        };

        let delegate = registry.require_filter(&init.target_bean_name)?;
        if init.target_filter_lifecycle {
            delegate.init(&init.filter_config)?;
        }

        debug!(
            filter = init.filter_config.filter_name(),
            bean = %init.target_bean_name,
            delegate = delegate.name(),
            "delegate filter bound"
        );

        Ok(Some(Arc::clone(self.delegate.get_or_init(|| delegate))))
    }
}

#[async_trait]
impl PortletFilter for DelegatingFilterProxy {
    fn name(&self) -> &str {
        "DelegatingFilterProxy"
    }

    fn init(&self, config: &FilterConfig) -> PortletResult<()> {
        let settings = self.config.clone().with_init_params(config)?;
        let initialized = Initialized {
            target_bean_name: settings
                .target_bean_name
                .unwrap_or_else(|| config.filter_name().to_string()),
            target_filter_lifecycle: settings.target_filter_lifecycle,
            filter_config: config.clone(),
        };

        self.initialized.set(initialized).map_err(|_| {
            PortletError::configuration(format!(
                "filter '{}' has already been initialized",
                config.filter_name()
            ))
        })?;

        self.init_delegate(false).map(|_| ())
    }

    async fn do_filter(
        &self,
        phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()> {
        let delegate = self
            .init_delegate(true)?
            .ok_or_else(|| PortletError::configuration("delegate filter could not be resolved"))?;

        if !delegate.supports(phase) {
            return Err(PortletError::configuration(format!(
                "The delegate filter '{}' does not handle {} but {} is configured with the {} lifecycle.",
                delegate.name(),
                phase,
                self.filter_name(),
                phase
            )));
        }

        delegate.do_filter(phase, request, response, chain).await
    }

    fn destroy(&self) {
        if let Some(delegate) = self.delegate.get()
            && self.is_target_filter_lifecycle()
        {
            delegate.destroy();
        }
    }
}
