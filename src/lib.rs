/*
 * Responsibility
 * - Portlet security filter pipeline (portlet / security / web)
 * - HTTP host: container, routes, middleware, config
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod host;
pub mod middleware;
pub mod portlet;
pub mod security;
pub mod state;
pub mod web;

#[cfg(test)]
mod test_support;

pub use error::{AuthenticationError, PortletError, PortletResult, SessionError};
