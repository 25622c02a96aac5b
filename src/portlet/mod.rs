/*
 * Responsibility
 * - Container-side model the security pipeline runs against
 * - PortletFilter / FilterChain capabilities and phase dispatch
 */
pub mod context;
pub mod dispatch;
pub mod filter;
pub mod phase;
pub mod preferences;
pub mod request;
pub mod session;

pub use context::{FilterConfig, PortletContext};
pub use filter::{FilterChain, PortletFilter};
pub use phase::{LIFECYCLE_PHASE, Phase};
pub use preferences::PortletPreferences;
pub use request::{AttributeValue, PortletRequest, PortletResponse, UserInfo, UserPrincipal};
pub use session::{MemorySessionStore, PortletSession, SessionAttribute, SessionScope, SessionStore};
