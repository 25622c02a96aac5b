/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - container: PortletContainer (delegating proxy + portlet)
 *   - preferences: hosted portlet の PortletPreferences
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::host::container::PortletContainer;
use crate::portlet::preferences::PortletPreferences;

#[derive(Clone, Debug)]
pub struct AppState {
    pub container: Arc<PortletContainer>,
    pub preferences: Arc<PortletPreferences>,
}

impl AppState {
    pub fn new(container: Arc<PortletContainer>, preferences: PortletPreferences) -> Self {
        Self {
            container,
            preferences: Arc::new(preferences),
        }
    }
}
