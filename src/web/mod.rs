/*
 * Responsibility
 * - Bridge between container-declared filters and filter beans
 * - DelegatingFilterProxy + the bean registry it resolves against
 */
pub mod delegating;
pub mod registry;

pub use delegating::{DelegatingFilterProxy, DelegatingProxyConfig};
pub use registry::BeanRegistry;
