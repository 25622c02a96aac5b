/*
 * Responsibility
 * - pre-authentication (container が主張する identity) の公開インターフェース
 */
pub mod details;
pub mod filter;
pub mod primary;

pub use details::PreAuthenticatedDetailsSource;
pub use filter::{
    AUTHENTICATION_EXCEPTION, AuthenticationOutcome, CREDENTIALS_PLACEHOLDER, PreAuthConfig,
    PreAuthenticationProcessingFilter,
};
pub use primary::{
    AuthenticationValidator, PrimaryAttributeAuthenticationValidator, PrimaryAttributeDetailsSource,
    primary_id,
};
