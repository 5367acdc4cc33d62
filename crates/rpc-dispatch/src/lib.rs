//! Request dispatch pipeline for RPC servers.
//!
//! A connection runtime hands each inbound frame to a [`Dispatcher`], which
//! runs it through a fixed-shape chain of [`Stage`]s and writes exactly one
//! response frame back:
//!
//! ```text
//! decode → route → <configured stages…> → validate → session → handler
//! ```
//!
//! The prologue decodes the payload into a [`ServiceCall`] and resolves the
//! [`Route`]. Configured stages (authorisation, auditing and similar concerns)
//! are resolved by name from a caller-owned [`StageRegistry`]. The epilogue
//! validates arguments, establishes the caller's [`SessionContext`] and runs
//! route-level stages before the terminal [`HandlerAdapter`] invokes the
//! business handler.
//!
//! Any stage may answer early by returning a response without calling
//! [`Next::run`]. Failures are returned rather than recovered, and the
//! dispatcher translates them once into an error [`Envelope`] whose message
//! ends with the source location the failure was raised at. Every dispatch
//! publishes one [`AFTER_RECEIVE`] event before the frame is sent.
//!
//! [`bootstrap_with`] wires the pieces together from [`rpc_config::Config`],
//! initialising structured telemetry and reporting progress through a
//! [`HealthReporter`].

mod bootstrap;
pub mod context;
mod dispatcher;
mod envelope;
mod errors;
mod events;
mod health;
mod packer;
mod pipeline;
mod registry;
mod routing;
pub mod stages;
mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod translator;
mod transport;

pub use bootstrap::{
    BootstrapError, Collaborators, ConfigLoader, DispatchService, StaticConfigLoader,
    SystemConfigLoader, bootstrap, bootstrap_with,
};
pub use context::{AttributeKey, Attributes, Request, Response};
pub use dispatcher::{DispatchFailure, DispatchPhase, Dispatcher};
pub use envelope::Envelope;
pub use errors::{DispatchError, PipelineError, codes};
pub use events::{
    AFTER_RECEIVE, DispatchEvent, DispatchStatus, EventBus, EventPublisher, EventSubscriber,
    TracingEventPublisher,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use packer::{DEFAULT_VERSION, JsonPacker, PackError, Packer, ServiceCall};
pub use pipeline::{FnStage, Next, Pipeline, PipelineBuilder, Stage, execute};
pub use registry::{RegistryError, StageRegistry};
pub use routing::{ArgumentValidator, Arity, Route, RouteKey, RouteTable, Router, ServiceHandler};
pub use stages::{
    AuthorisationStage, Authoriser, ConnectionSessions, Decision, HandlerAdapter, SessionContext,
    SessionResolver,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use translator::ErrorTranslator;
pub use transport::{ConnectionId, SessionId, Transport};

#[cfg(test)]
mod tests;
