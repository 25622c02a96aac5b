/*
 * Responsibility
 * - 名前付き filter bean (delegating proxy が参照する application context)
 */
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{PortletError, PortletResult};
use crate::portlet::filter::PortletFilter;

#[derive(Default)]
pub struct BeanRegistry {
    filters: BTreeMap<String, Arc<dyn PortletFilter>>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `filter` under `name`, replacing any previous bean.
    pub fn register_filter(&mut self, name: impl Into<String>, filter: Arc<dyn PortletFilter>) -> &mut Self {
        self.filters.insert(name.into(), filter);
        self
    }

    pub fn filter(&self, name: &str) -> Option<Arc<dyn PortletFilter>> {
        self.filters.get(name).cloned()
    }

    pub fn require_filter(&self, name: &str) -> PortletResult<Arc<dyn PortletFilter>> {
        self.filter(name).ok_or_else(|| {
            PortletError::configuration(format!("No filter bean named '{name}' is defined"))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }
}

impl fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}
