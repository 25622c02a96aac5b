/*
 * Responsibility
 * - The hosted portlet container (declared filter + portlet)
 * - HTTP request → portlet request mapping
 * - Wiring the security pipeline from Config
 */
pub mod container;
pub mod http;
pub mod pipeline;
pub mod portlet;

pub use container::{Portlet, PortletContainer};
pub use portlet::ProfilePortlet;
