//! Per-frame dispatch coordination.
//!
//! The dispatcher turns one inbound frame into exactly one outbound frame. It
//! builds the request context, runs the shared pipeline inside a panic
//! boundary, translates failures into error envelopes, publishes the
//! lifecycle event and finally writes the bytes back to the connection.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::context::{Request, keys};
use crate::errors::{DispatchError, PipelineError};
use crate::events::{DispatchEvent, DispatchStatus, EventPublisher};
use crate::packer::{PackError, Packer};
use crate::pipeline::Pipeline;
use crate::translator::ErrorTranslator;
use crate::transport::{ConnectionId, SessionId, Transport};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::dispatch");

/// Failures surfaced to the connection runtime after the frame was handled.
///
/// By the time one of these is returned the lifecycle event has been
/// published and a send has been attempted.
#[derive(Debug, Error)]
pub enum DispatchFailure {
    /// The error envelope could not be serialised; an empty frame was sent.
    #[error("failed to translate dispatch failure: {source}")]
    Translate {
        /// Packer error raised for the error envelope.
        #[source]
        source: PackError,
    },
    /// The translator panicked; an empty frame was sent.
    #[error("error translation panicked: {message}")]
    TranslatorPanicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// Writing the response frame failed. The send is not retried.
    #[error("failed to send response to connection {connection_id}: {source}")]
    Send {
        /// Connection the frame was addressed to.
        connection_id: ConnectionId,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Steps a single dispatch moves through, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    /// The frame was handed to the dispatcher.
    Received,
    /// The request context is being assembled.
    BuildingContext,
    /// The pipeline is running.
    Executing,
    /// The pipeline produced output bytes.
    Completed,
    /// The pipeline failed or panicked.
    Failed,
    /// The failure is being turned into an error envelope.
    Translating,
    /// The frame is being written to the connection.
    Sending,
    /// The frame was written.
    Sent,
}

impl DispatchPhase {
    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::BuildingContext => "building_context",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Translating => "translating",
            Self::Sending => "sending",
            Self::Sent => "sent",
        }
    }
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame-level entry point shared by every connection.
///
/// The dispatcher holds only read-only collaborators, so one instance can be
/// shared across threads and used for any number of concurrent dispatches.
pub struct Dispatcher {
    pipeline: Pipeline,
    packer: Arc<dyn Packer>,
    translator: ErrorTranslator,
    events: Arc<dyn EventPublisher>,
}

impl Dispatcher {
    /// Creates a dispatcher around a built pipeline.
    ///
    /// `packer` is stored on every request context and used to serialise
    /// error envelopes.
    pub fn new(
        pipeline: Pipeline,
        packer: Arc<dyn Packer>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            pipeline,
            translator: ErrorTranslator::new(Arc::clone(&packer)),
            packer,
            events,
        }
    }

    /// The pipeline every dispatch runs through.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Handles one inbound frame and writes exactly one response frame to
    /// `connection`.
    ///
    /// The lifecycle event is published before the send on every path,
    /// including when the pipeline fails or panics.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchFailure::Translate`] or
    /// [`DispatchFailure::TranslatorPanicked`] when the failure envelope
    /// could not be produced (an empty frame is sent instead), and
    /// [`DispatchFailure::Send`] when the transport rejects the frame.
    pub fn dispatch(
        &self,
        connection: Arc<dyn Transport>,
        connection_id: ConnectionId,
        session_id: SessionId,
        payload: Vec<u8>,
    ) -> Result<(), DispatchFailure> {
        trace_phase(DispatchPhase::Received, connection_id, session_id);
        let request = self.build_request(&connection, connection_id, session_id, payload);

        trace_phase(DispatchPhase::Executing, connection_id, session_id);
        let (bytes, status, translation) = match self.execute(request) {
            Ok(bytes) => {
                trace_phase(DispatchPhase::Completed, connection_id, session_id);
                (bytes, DispatchStatus::Completed, None)
            }
            Err(failure) => {
                trace_phase(DispatchPhase::Failed, connection_id, session_id);
                trace_phase(DispatchPhase::Translating, connection_id, session_id);
                match self.translate(&failure) {
                    Ok(bytes) => (
                        bytes,
                        DispatchStatus::Failed {
                            code: failure.code(),
                        },
                        None,
                    ),
                    Err(untranslated) => {
                        (Vec::new(), DispatchStatus::Untranslated, Some(untranslated))
                    }
                }
            }
        };

        self.publish(&DispatchEvent::after_receive(
            connection_id,
            session_id,
            status,
            bytes.len(),
        ));

        trace_phase(DispatchPhase::Sending, connection_id, session_id);
        let sent = connection
            .send(connection_id, &bytes)
            .map_err(|source| DispatchFailure::Send {
                connection_id,
                source,
            });

        match (translation, sent) {
            (Some(untranslated), sent) => {
                if let Err(send_failure) = sent {
                    error!(
                        target: DISPATCH_TARGET,
                        %connection_id,
                        error = %send_failure,
                        "failed to send empty frame after translation failure"
                    );
                }
                error!(
                    target: DISPATCH_TARGET,
                    %connection_id,
                    error = %untranslated,
                    "sent empty frame for untranslatable failure"
                );
                Err(untranslated)
            }
            (None, Err(send_failure)) => {
                error!(
                    target: DISPATCH_TARGET,
                    %connection_id,
                    error = %send_failure,
                    "failed to send response"
                );
                Err(send_failure)
            }
            (None, Ok(())) => {
                trace_phase(DispatchPhase::Sent, connection_id, session_id);
                Ok(())
            }
        }
    }

    fn build_request(
        &self,
        connection: &Arc<dyn Transport>,
        connection_id: ConnectionId,
        session_id: SessionId,
        payload: Vec<u8>,
    ) -> Request {
        trace_phase(DispatchPhase::BuildingContext, connection_id, session_id);
        Request::placeholder()
            .with_attribute(keys::CONNECTION, Arc::clone(connection))
            .with_attribute(keys::CONNECTION_ID, connection_id)
            .with_attribute(keys::SESSION_ID, session_id)
            .with_attribute(keys::PAYLOAD, Arc::<[u8]>::from(payload))
            .with_attribute(keys::PACKER, Arc::clone(&self.packer))
    }

    fn execute(&self, request: Request) -> Result<Vec<u8>, PipelineError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.handle(request)));
        let response = match outcome {
            Ok(handled) => handled?,
            Err(payload) => {
                return Err(PipelineError::new(DispatchError::panicked(panic_message(
                    payload,
                ))));
            }
        };

        response.output().map(<[u8]>::to_vec).ok_or_else(|| {
            PipelineError::new(DispatchError::invalid_response(
                "pipeline completed without output",
            ))
        })
    }

    fn translate(&self, failure: &PipelineError) -> Result<Vec<u8>, DispatchFailure> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.translator.translate(failure))) {
            Ok(Ok(response)) => Ok(response.output().map(<[u8]>::to_vec).unwrap_or_default()),
            Ok(Err(source)) => Err(DispatchFailure::Translate { source }),
            Err(payload) => Err(DispatchFailure::TranslatorPanicked {
                message: panic_message(payload),
            }),
        }
    }

    fn publish(&self, event: &DispatchEvent) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.events.publish(event))) {
            error!(
                target: DISPATCH_TARGET,
                connection_id = %event.connection_id,
                panic = %panic_message(payload),
                "event publisher panicked"
            );
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stages", &self.pipeline.stage_names())
            .finish_non_exhaustive()
    }
}

fn trace_phase(phase: DispatchPhase, connection_id: ConnectionId, session_id: SessionId) {
    debug!(
        target: DISPATCH_TARGET,
        phase = phase.as_str(),
        %connection_id,
        %session_id,
        "dispatch phase"
    );
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::context::Response;
    use crate::envelope::Envelope;
    use crate::errors::codes;
    use crate::packer::{JsonPacker, MockPacker, ServiceCall};
    use crate::pipeline::{FnStage, Next, PipelineBuilder, Stage};
    use crate::routing::{Route, RouteTable};
    use crate::stages::test_helpers::echo;
    use crate::testing::{RecordingPublisher, RecordingTransport};
    use crate::transport::MockTransport;

    fn routes() -> Arc<RouteTable> {
        Arc::new(RouteTable::new().with_route(Route::method("demo.Echo", "say", echo)))
    }

    fn dispatcher_with(stages: Vec<Arc<dyn Stage>>, events: Arc<dyn EventPublisher>) -> Dispatcher {
        let packer: Arc<dyn Packer> = Arc::new(JsonPacker);
        let pipeline = PipelineBuilder::new(Arc::clone(&packer), routes())
            .stages(stages)
            .build();
        Dispatcher::new(pipeline, packer, events)
    }

    fn say_hi() -> Vec<u8> {
        serde_json::to_vec(&ServiceCall::new("demo.Echo", "say", vec![json!("hi")]))
            .expect("call serialises")
    }

    fn envelope(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("envelope json")
    }

    #[test]
    fn echo_call_sends_packed_success_envelope() {
        let transport = Arc::new(RecordingTransport::default());
        let events = Arc::new(RecordingPublisher::default());
        let dispatcher = dispatcher_with(Vec::new(), events.clone());

        dispatcher
            .dispatch(transport.clone(), ConnectionId(5), SessionId(1), say_hi())
            .expect("dispatch succeeds");

        let expected = JsonPacker
            .pack(&Envelope::success(json!("hi")))
            .expect("pack");
        assert_eq!(transport.frames(), [(ConnectionId(5), expected)]);
        let recorded = events.events();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, DispatchStatus::Completed);
    }

    #[test]
    fn panicking_stage_is_translated() {
        let transport = Arc::new(RecordingTransport::default());
        let events = Arc::new(RecordingPublisher::default());
        let explode: Arc<dyn Stage> = Arc::new(FnStage::new(
            "explode",
            |_request: Request, _next: Next<'_>| -> Result<Response, PipelineError> {
                panic!("stage exploded")
            },
        ));
        let dispatcher = dispatcher_with(vec![explode], events.clone());

        dispatcher
            .dispatch(transport.clone(), ConnectionId(2), SessionId(1), say_hi())
            .expect("panic is translated");

        let frames = transport.frames();
        assert_eq!(frames.len(), 1);
        let body = envelope(&frames[0].1);
        assert_eq!(body["data"], json!(""));
        assert_eq!(body["code"], json!(codes::UNCLASSIFIED));
        let message = body["message"].as_str().expect("message string");
        assert!(message.contains("stage exploded"));
        assert!(message.contains("dispatcher.rs:"));
        assert_eq!(
            events.events()[0].status,
            DispatchStatus::Failed {
                code: codes::UNCLASSIFIED
            }
        );
    }

    #[test]
    fn translation_failure_sends_empty_frame_once() {
        let mut packer = MockPacker::new();
        packer
            .expect_unpack()
            .returning(|_| Err(PackError::Empty));
        packer
            .expect_pack()
            .times(1)
            .returning(|_| Err(PackError::codec("encoder offline")));
        let packer: Arc<dyn Packer> = Arc::new(packer);
        let pipeline = PipelineBuilder::new(Arc::clone(&packer), routes()).build();
        let events = Arc::new(RecordingPublisher::default());
        let dispatcher = Dispatcher::new(pipeline, packer, events.clone());
        let transport = Arc::new(RecordingTransport::default());

        let failure = dispatcher
            .dispatch(transport.clone(), ConnectionId(8), SessionId(1), Vec::new())
            .expect_err("translation fails");

        assert!(matches!(failure, DispatchFailure::Translate { .. }));
        assert_eq!(transport.frames(), [(ConnectionId(8), Vec::new())]);
        assert_eq!(events.events()[0].status, DispatchStatus::Untranslated);
    }

    #[test]
    fn panicking_translator_sends_empty_frame_once() {
        let mut packer = MockPacker::new();
        packer
            .expect_unpack()
            .returning(|_| Err(PackError::Empty));
        packer
            .expect_pack()
            .returning(|_| panic!("encoder exploded"));
        let packer: Arc<dyn Packer> = Arc::new(packer);
        let pipeline = PipelineBuilder::new(Arc::clone(&packer), routes()).build();
        let events = Arc::new(RecordingPublisher::default());
        let dispatcher = Dispatcher::new(pipeline, packer, events.clone());
        let transport = Arc::new(RecordingTransport::default());

        let failure = dispatcher
            .dispatch(transport.clone(), ConnectionId(9), SessionId(1), b"{".to_vec())
            .expect_err("translator panics");

        match failure {
            DispatchFailure::TranslatorPanicked { message } => {
                assert_eq!(message, "encoder exploded");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert_eq!(transport.frames(), [(ConnectionId(9), Vec::new())]);
        let recorded = events.events();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, DispatchStatus::Untranslated);
        assert_eq!(recorded[0].response_len, 0);
    }

    #[test]
    fn send_failure_is_returned_without_retry() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _| Err(io::Error::from(io::ErrorKind::BrokenPipe)));
        let events = Arc::new(RecordingPublisher::default());
        let dispatcher = dispatcher_with(Vec::new(), events.clone());

        let failure = dispatcher
            .dispatch(Arc::new(transport), ConnectionId(3), SessionId(1), say_hi())
            .expect_err("send fails");

        assert!(matches!(
            failure,
            DispatchFailure::Send {
                connection_id: ConnectionId(3),
                ..
            }
        ));
        assert_eq!(events.events().len(), 1);
    }

    #[test]
    fn event_is_published_before_the_send() {
        let mut transport = MockTransport::new();
        let published = Arc::new(RecordingPublisher::default());
        let observed = Arc::clone(&published);
        transport
            .expect_send()
            .times(1)
            .returning(move |_, _| {
                assert_eq!(observed.events().len(), 1, "event precedes send");
                Ok(())
            });
        let dispatcher = dispatcher_with(Vec::new(), published);

        dispatcher
            .dispatch(Arc::new(transport), ConnectionId(1), SessionId(1), say_hi())
            .expect("dispatch succeeds");
    }

    #[test]
    fn panicking_publisher_does_not_prevent_the_send() {
        struct Exploding;

        impl EventPublisher for Exploding {
            fn publish(&self, _event: &DispatchEvent) {
                panic!("subscriber failed");
            }
        }

        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher_with(Vec::new(), Arc::new(Exploding));

        dispatcher
            .dispatch(transport.clone(), ConnectionId(6), SessionId(1), say_hi())
            .expect("send still happens");
        assert_eq!(transport.frames().len(), 1);
    }

    #[test]
    fn context_carries_the_dispatch_inputs() {
        let probe: Arc<dyn Stage> = Arc::new(FnStage::new(
            "probe",
            |request: Request, _next: Next<'_>| -> Result<Response, PipelineError> {
                let connection = request.require(keys::CONNECTION_ID)?;
                let session = request.require(keys::SESSION_ID)?;
                let payload = request.require(keys::PAYLOAD)?;
                request.require(keys::CONNECTION)?;
                request.require(keys::PACKER)?;
                Ok(Response::with_output_bytes(
                    format!("{connection}:{session}:{}", payload.len()).into_bytes(),
                ))
            },
        ));
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher_with(vec![probe], Arc::new(RecordingPublisher::default()));
        let payload = say_hi();
        let expected = format!("11:4:{}", payload.len()).into_bytes();

        dispatcher
            .dispatch(transport.clone(), ConnectionId(11), SessionId(4), payload)
            .expect("probe responds");
        assert_eq!(transport.frames(), [(ConnectionId(11), expected)]);
    }

    #[test]
    fn panic_messages_are_extracted() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7_u8)), "non-string panic payload");
    }

    #[test]
    fn phases_render_in_snake_case() {
        assert_eq!(DispatchPhase::BuildingContext.to_string(), "building_context");
        assert_eq!(DispatchPhase::Sent.as_str(), "sent");
    }
}
