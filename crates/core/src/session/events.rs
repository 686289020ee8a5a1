//! Broadcast bus for session events
//!
//! UI and session managers subscribe here instead of every call site
//! plumbing auth failures by hand. Publishing with no subscribers is fine.

use geoquest_domain::constants::SESSION_EVENT_CAPACITY;
use tokio::sync::broadcast;
use tracing::debug;

/// Something global happened to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// New credentials were stored (login or refresh).
    TokensUpdated { user_id: String },
    /// Credentials were wiped.
    LoggedOut,
    /// A protected call hit 401 and the session could not be recovered.
    TokenExpired,
    /// The server answered 403.
    AccessDenied { path: String },
    /// A call failed at transport or HTTP level, as `METHOD path -> message`.
    RequestError(String),
}

impl SessionEvent {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TokensUpdated { .. } => "tokens_updated",
            Self::LoggedOut => "logged_out",
            Self::TokenExpired => "token_expired",
            Self::AccessDenied { .. } => "access_denied",
            Self::RequestError(_) => "request_error",
        }
    }
}

/// Cloneable handle onto the event channel
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(SESSION_EVENT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        let label = event.label();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event = label, receivers, "session event published"),
            Err(_) => debug!(event = label, "session event dropped (no subscribers)"),
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_each_event() {
        let events = SessionEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        events.publish(SessionEvent::AccessDenied { path: "/player/me".into() });

        let expected = SessionEvent::AccessDenied { path: "/player/me".into() };
        assert_eq!(first.recv().await.unwrap(), expected);
        assert_eq!(second.recv().await.unwrap(), expected);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let events = SessionEvents::new();
        events.publish(SessionEvent::LoggedOut);
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(SessionEvent::TokenExpired.label(), "token_expired");
        assert_eq!(SessionEvent::RequestError("x".into()).label(), "request_error");
    }
}
