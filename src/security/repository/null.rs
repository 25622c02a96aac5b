use async_trait::async_trait;

use crate::portlet::request::PortletRequest;
use crate::security::context::SecurityContext;
use crate::security::repository::{RequestResponseHolder, SecurityContextRepository};

/// Stores nothing. Every request starts with an empty context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSecurityContextRepository;

#[async_trait]
impl SecurityContextRepository for NullSecurityContextRepository {
    async fn load_context(&self, _holder: &mut RequestResponseHolder<'_>) -> SecurityContext {
        SecurityContext::new()
    }

    fn save_context(&self, _context: &SecurityContext, _holder: &mut RequestResponseHolder<'_>) {}

    fn contains_context(&self, _request: &PortletRequest) -> bool {
        false
    }
}
