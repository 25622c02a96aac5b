/*
 * Responsibility
 * - container 側の PortletContext (application context の保持)
 * - init 時に filter へ渡す FilterConfig
 */
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::web::registry::BeanRegistry;

/// The portlet application's context. The application context (bean
/// registry) may be attached after filters are created, which is why the
/// delegating proxy resolves its target lazily.
#[derive(Debug)]
pub struct PortletContext {
    name: String,
    application_context: RwLock<Option<Arc<BeanRegistry>>>,
}

impl PortletContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            application_context: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn application_context(&self) -> Option<Arc<BeanRegistry>> {
        self.application_context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_application_context(&self, registry: Arc<BeanRegistry>) {
        *self
            .application_context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(registry);
    }
}

/// Container-declared filter configuration: a name plus string init params.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    filter_name: String,
    init_params: HashMap<String, String>,
    portlet_context: Arc<PortletContext>,
}

impl FilterConfig {
    pub fn new(filter_name: impl Into<String>, portlet_context: Arc<PortletContext>) -> Self {
        Self {
            filter_name: filter_name.into(),
            init_params: HashMap::new(),
            portlet_context,
        }
    }

    pub fn with_init_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.init_params.insert(name.into(), value.into());
        self
    }

    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    pub fn init_param(&self, name: &str) -> Option<&str> {
        self.init_params.get(name).map(String::as_str)
    }

    pub fn portlet_context(&self) -> &Arc<PortletContext> {
        &self.portlet_context
    }
}
