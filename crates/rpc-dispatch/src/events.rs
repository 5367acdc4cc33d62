//! Post-dispatch lifecycle events.
//!
//! Every dispatch publishes exactly one [`DispatchEvent`] named
//! [`AFTER_RECEIVE`] before the response frame is written. Publishers are
//! injected into the dispatcher; there is no global event registry.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::dispatcher::DISPATCH_TARGET;
use crate::transport::{ConnectionId, SessionId};

/// Name of the event emitted after each dispatch.
pub const AFTER_RECEIVE: &str = "rpc.server.after_receive";

/// How a dispatch concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The pipeline produced a response.
    Completed,
    /// The pipeline failed and an error envelope was produced.
    Failed {
        /// Classification written to the envelope.
        code: i32,
    },
    /// The failure could not be translated; an empty frame is sent.
    Untranslated,
}

impl DispatchStatus {
    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
            Self::Untranslated => "untranslated",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event published once per dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEvent {
    /// Event name, always [`AFTER_RECEIVE`].
    pub name: &'static str,
    /// Connection the frame arrived on.
    pub connection_id: ConnectionId,
    /// Session reported by the runtime.
    pub session_id: SessionId,
    /// Outcome of the dispatch.
    pub status: DispatchStatus,
    /// Size of the frame about to be written.
    pub response_len: usize,
}

impl DispatchEvent {
    /// Builds an [`AFTER_RECEIVE`] event.
    #[must_use]
    pub fn after_receive(
        connection_id: ConnectionId,
        session_id: SessionId,
        status: DispatchStatus,
        response_len: usize,
    ) -> Self {
        Self {
            name: AFTER_RECEIVE,
            connection_id,
            session_id,
            status,
            response_len,
        }
    }
}

/// Receives lifecycle events from the dispatcher.
pub trait EventPublisher: Send + Sync {
    /// Publishes `event`. Publishing cannot fail the dispatch.
    fn publish(&self, event: &DispatchEvent);
}

impl<T> EventPublisher for Arc<T>
where
    T: EventPublisher + ?Sized,
{
    fn publish(&self, event: &DispatchEvent) {
        (**self).publish(event);
    }
}

/// Callback registered with an [`EventBus`].
pub trait EventSubscriber: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &DispatchEvent);
}

impl<F> EventSubscriber for F
where
    F: Fn(&DispatchEvent) + Send + Sync,
{
    fn on_event(&self, event: &DispatchEvent) {
        self(event);
    }
}

/// Fan-out publisher delivering each event to every subscriber in
/// registration order.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber.
    #[must_use]
    pub fn subscribe(mut self, subscriber: impl EventSubscriber + 'static) -> Self {
        self.subscribers.push(Arc::new(subscriber));
        self
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether the bus has no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: &DispatchEvent) {
        for subscriber in &self.subscribers {
            subscriber.on_event(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Publisher that records each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: &DispatchEvent) {
        let code = match event.status {
            DispatchStatus::Failed { code } => Some(code),
            DispatchStatus::Completed | DispatchStatus::Untranslated => None,
        };
        info!(
            target: DISPATCH_TARGET,
            event = event.name,
            connection_id = %event.connection_id,
            session_id = %event.session_id,
            status = %event.status,
            code,
            response_len = event.response_len,
            "dispatch completed"
        );
    }
}
