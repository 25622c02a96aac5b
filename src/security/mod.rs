/*
 * Responsibility
 * - Authentication model (tokens, details, context, managers, events)
 * - Filter chain proxy + request matchers
 * - Context persistence (filter + repositories)
 * - Pre-authentication processing
 */
pub mod authentication;
pub mod chain;
pub mod context;
pub mod details;
pub mod event;
pub mod manager;
pub mod matcher;
pub mod persistence;
pub mod preauth;
pub mod repository;

pub use authentication::{Authentication, AuthenticationKind, GrantedAuthority};
pub use chain::{ChainDefinition, FilterChainProxy, SecurityFilterChain};
pub use context::{SecurityContext, SecurityContextHolder};
pub use details::{AuthenticationDetails, AuthenticationDetailsSource};
pub use manager::{AuthenticationManager, PreAuthenticatedAuthenticationManager};
pub use matcher::RequestMatcher;
pub use persistence::SecurityContextPersistenceFilter;
pub use repository::SecurityContextRepository;
