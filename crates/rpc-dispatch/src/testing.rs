//! Test doubles for transports, publishers and stages.
//!
//! Compiled for this crate's tests and, behind the `test-support` feature,
//! for downstream crates exercising their own stages.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::context::{Request, Response};
use crate::errors::PipelineError;
use crate::events::{DispatchEvent, EventPublisher};
use crate::pipeline::{FnStage, Next, Stage};
use crate::transport::{ConnectionId, Transport};

/// Transport that records every frame it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    frames: Mutex<Vec<(ConnectionId, Vec<u8>)>>,
}

impl RecordingTransport {
    /// Frames sent so far, in order.
    #[must_use]
    pub fn frames(&self) -> Vec<(ConnectionId, Vec<u8>)> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Frames sent to `connection`.
    #[must_use]
    pub fn frames_for(&self, connection: ConnectionId) -> Vec<Vec<u8>> {
        self.frames()
            .into_iter()
            .filter(|(id, _)| *id == connection)
            .map(|(_, bytes)| bytes)
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, connection: ConnectionId, bytes: &[u8]) -> std::io::Result<()> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((connection, bytes.to_vec()));
        Ok(())
    }
}

/// Publisher that records every lifecycle event.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingPublisher {
    /// Events published so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &DispatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Pass-through stage named `name` and the counter it bumps on every call.
#[must_use]
pub fn counting_stage(name: &str) -> (Arc<dyn Stage>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let stage = FnStage::new(name, move |request: Request, next: Next<'_>| {
        seen.fetch_add(1, Ordering::SeqCst);
        next.run(request)
    });
    (Arc::new(stage), count)
}

/// Shared log of stage names in the order the stages ran.
#[derive(Debug, Clone, Default)]
pub struct OrderLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OrderLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass-through stage named `name` that appends its name when it runs.
    #[must_use]
    pub fn stage(&self, name: &str) -> Arc<dyn Stage> {
        let entries = Arc::clone(&self.entries);
        let label = name.to_owned();
        Arc::new(FnStage::new(name, move |request: Request, next: Next<'_>| {
            entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(label.clone());
            next.run(request)
        }))
    }

    /// Recorded names.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Terminal stage answering every request with the bytes `respond` returns.
pub fn responder<F>(respond: F) -> Arc<dyn Stage>
where
    F: Fn(&Request) -> Vec<u8> + Send + Sync + 'static,
{
    Arc::new(FnStage::new(
        "responder",
        move |request: Request, _next: Next<'_>| -> Result<Response, PipelineError> {
            Ok(Response::with_output_bytes(respond(&request)))
        },
    ))
}
