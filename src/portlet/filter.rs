/*
 * Responsibility
 * - PortletFilter: 4 つの lifecycle phase を 1 つの trait で扱う (phase は値で渡す)
 * - FilterChain: 各 filter に渡される "next"
 * - 一部の phase しか扱わない filter は supports() で宣言
 */
use std::fmt;

use async_trait::async_trait;

use crate::error::PortletResult;
use crate::portlet::context::FilterConfig;
use crate::portlet::phase::Phase;
use crate::portlet::request::{PortletRequest, PortletResponse};

#[async_trait]
pub trait PortletFilter: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn supports(&self, _phase: Phase) -> bool {
        true
    }

    fn init(&self, _config: &FilterConfig) -> PortletResult<()> {
        Ok(())
    }

    /// Handle one request. Call `chain.do_filter` to continue; returning
    /// without doing so ends processing here.
    async fn do_filter(
        &self,
        phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
        chain: &mut dyn FilterChain,
    ) -> PortletResult<()>;

    fn destroy(&self) {}
}

impl fmt::Debug for dyn PortletFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
pub trait FilterChain: Send {
    async fn do_filter(
        &mut self,
        phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
    ) -> PortletResult<()>;
}
