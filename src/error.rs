/*
 * Responsibility
 * - Error kinds surfaced by the portlet pipeline (configuration, authentication,
 *   access denied, session, downstream I/O / container)
 * - IntoResponse for the HTTP host (status / JSON error body)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type PortletResult<T> = Result<T, PortletError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Rejections raised by an `AuthenticationManager`.
///
/// Cloneable so the failure can be stashed on the request for downstream
/// handlers after the chain continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("bad credentials")]
    BadCredentials,
    #[error("user not found: {0}")]
    UsernameNotFound(String),
    #[error("account disabled: {0}")]
    Disabled(String),
    #[error("no pre-authenticated credentials found in request")]
    PreAuthenticatedCredentialsNotFound,
    #[error("no authentication provider supports {0}")]
    ProviderNotFound(&'static str),
    #[error("authentication service error: {0}")]
    Service(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot create a session after the response has been committed")]
    ResponseCommitted,
    #[error("session has been invalidated")]
    Invalidated,
}

#[derive(Debug, Error)]
pub enum PortletError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container error: {0}")]
    Container(String),
}

impl PortletError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    pub fn container(message: impl Into<String>) -> Self {
        Self::Container(message.into())
    }
}

impl IntoResponse for PortletError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            PortletError::Authentication(e) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string())
            }
            PortletError::AccessDenied(message) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", message.clone())
            }
            PortletError::Configuration(_)
            | PortletError::Session(_)
            | PortletError::Io(_)
            | PortletError::Container(_) => {
                tracing::error!(error = %self, "portlet request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "internal server error".into(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}
