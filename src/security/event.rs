/*
 * Responsibility
 * - 認証イベントと publisher (tracing / broadcast)
 */
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::security::authentication::Authentication;

#[derive(Debug, Clone)]
pub enum AuthenticationEvent {
    /// A filter authenticated the caller as part of handling a request.
    InteractiveAuthenticationSuccess {
        authentication: Arc<Authentication>,
        generated_by: &'static str,
        timestamp: DateTime<Utc>,
    },
}

impl AuthenticationEvent {
    pub fn interactive_success(authentication: Arc<Authentication>, generated_by: &'static str) -> Self {
        Self::InteractiveAuthenticationSuccess {
            authentication,
            generated_by,
            timestamp: Utc::now(),
        }
    }

    pub fn authentication(&self) -> &Arc<Authentication> {
        match self {
            Self::InteractiveAuthenticationSuccess { authentication, .. } => authentication,
        }
    }
}

pub trait ApplicationEventPublisher: Send + Sync + fmt::Debug {
    fn publish_event(&self, event: AuthenticationEvent);
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl ApplicationEventPublisher for TracingEventPublisher {
    fn publish_event(&self, event: AuthenticationEvent) {
        match &event {
            AuthenticationEvent::InteractiveAuthenticationSuccess {
                authentication,
                generated_by,
                timestamp,
            } => tracing::info!(
                principal = %authentication.name(),
                generated_by,
                %timestamp,
                "interactive authentication success"
            ),
        }
    }
}

/// Fans events out to in-process subscribers. Publishing with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<AuthenticationEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthenticationEvent> {
        self.sender.subscribe()
    }
}

impl ApplicationEventPublisher for BroadcastEventPublisher {
    fn publish_event(&self, event: AuthenticationEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("authentication event dropped: no subscribers");
        }
    }
}
