//! Shared worlds and doubles for the behaviour suites.

use std::cell::RefCell;
use std::ffi::OsString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ortho_config::{OrthoConfig, OrthoError};
use serde_json::{Value, json};

use rpc_config::Config;

use crate::bootstrap::{
    BootstrapError, Collaborators, ConfigLoader, DispatchService, StaticConfigLoader,
    bootstrap_with,
};
use crate::context::Request;
use crate::dispatcher::{DispatchFailure, Dispatcher};
use crate::errors::DispatchError;
use crate::health::HealthReporter;
use crate::packer::{JsonPacker, Packer, ServiceCall};
use crate::pipeline::{PipelineBuilder, Stage};
use crate::registry::StageRegistry;
use crate::routing::{Arity, Route, RouteTable, Router};
use crate::testing::{OrderLog, RecordingPublisher, RecordingTransport};
use crate::transport::{ConnectionId, SessionId};

/// Interface every test route is registered under.
pub const ECHO_INTERFACE: &str = "demo.Echo";

/// Description carried by the failing handler.
pub const HANDLER_FAILURE: &str = "ledger unavailable";

/// Router wrapper counting resolution attempts.
pub struct CountingRouter {
    table: RouteTable,
    lookups: AtomicUsize,
}

impl CountingRouter {
    /// Router with no registered routes.
    pub fn empty() -> Self {
        Self {
            table: RouteTable::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Router for CountingRouter {
    fn resolve(&self, call: &ServiceCall) -> Option<Arc<Route>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.table.resolve(call)
    }
}

/// Echo service with `say` (echoes its single argument) and `fail` (always
/// fails) methods, counting how often `say` runs.
pub fn echo_router(invocations: Arc<AtomicUsize>) -> CountingRouter {
    let say = move |_request: &Request, params: &[Value]| -> Result<Value, DispatchError> {
        invocations.fetch_add(1, Ordering::SeqCst);
        Ok(params.first().cloned().unwrap_or(Value::Null))
    };
    let fail = |_request: &Request, _params: &[Value]| -> Result<Value, DispatchError> {
        Err(DispatchError::handler(HANDLER_FAILURE))
    };

    CountingRouter {
        table: RouteTable::new()
            .with_route(Route::method(ECHO_INTERFACE, "say", say).with_validator(Arity::exactly(1)))
            .with_route(Route::method(ECHO_INTERFACE, "fail", fail)),
        lookups: AtomicUsize::new(0),
    }
}

/// Encodes a call to the echo service.
pub fn call_payload(method: &str, params: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&ServiceCall::new(ECHO_INTERFACE, method, params))
        .expect("service call serialises")
}

/// Bytes of the success envelope for `data` as the JSON packer writes them.
pub fn success_bytes(data: &str) -> Vec<u8> {
    JsonPacker
        .pack(&crate::envelope::Envelope::success(json!(data)))
        .expect("success envelope packs")
}

/// Scenario world for the dispatch behaviour suite.
pub struct DispatchWorld {
    pub transport: Arc<RecordingTransport>,
    pub events: Arc<RecordingPublisher>,
    pub invocations: Arc<AtomicUsize>,
    pub router: Arc<CountingRouter>,
    pub configured: Vec<Arc<dyn Stage>>,
    dispatcher: Option<Dispatcher>,
    pub results: Vec<Result<(), DispatchFailure>>,
}

impl DispatchWorld {
    #[must_use]
    pub fn new() -> Self {
        let invocations = Arc::new(AtomicUsize::new(0));
        Self {
            transport: Arc::new(RecordingTransport::default()),
            events: Arc::new(RecordingPublisher::default()),
            router: Arc::new(CountingRouter::empty()),
            invocations,
            configured: Vec::new(),
            dispatcher: None,
            results: Vec::new(),
        }
    }

    /// Registers the echo service; must run before the first dispatch.
    pub fn use_echo_service(&mut self) {
        assert!(self.dispatcher.is_none(), "dispatcher already built");
        self.router = Arc::new(echo_router(Arc::clone(&self.invocations)));
    }

    fn dispatcher(&mut self) -> &Dispatcher {
        let packer: Arc<dyn Packer> = Arc::new(JsonPacker);
        let router: Arc<dyn Router> = self.router.clone();
        let configured = self.configured.clone();
        let events: Arc<RecordingPublisher> = Arc::clone(&self.events);
        self.dispatcher.get_or_insert_with(|| {
            let pipeline = PipelineBuilder::new(Arc::clone(&packer), router)
                .stages(configured)
                .build();
            Dispatcher::new(pipeline, packer, events)
        })
    }

    /// Dispatches `payload` on a single long-lived connection.
    pub fn send(&mut self, payload: Vec<u8>) {
        let transport = Arc::clone(&self.transport);
        let result = self
            .dispatcher()
            .dispatch(transport, ConnectionId(1), SessionId(1), payload);
        self.results.push(result);
    }

    pub fn first_response(&self) -> Vec<u8> {
        self.transport
            .frames()
            .into_iter()
            .next()
            .map(|(_, bytes)| bytes)
            .expect("a frame was sent")
    }

    pub fn last_response(&self) -> Vec<u8> {
        self.transport
            .frames()
            .pop()
            .map(|(_, bytes)| bytes)
            .expect("a frame was sent")
    }

    pub fn last_envelope(&self) -> Value {
        serde_json::from_slice(&self.last_response()).expect("response is json")
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded(Vec<String>),
    BootstrapFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config, stages: &[&str]) {
        self.record(HealthEvent::BootstrapSucceeded(
            stages.iter().map(|stage| (*stage).to_owned()).collect(),
        ));
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }
}

/// Loader that fails by passing an unknown CLI flag.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("rpc-dispatch"),
            OsString::from("--no-such-option"),
        ];
        Config::load_from_iter(args)
    }
}

/// Scenario world for the bootstrap behaviour suite.
pub struct BootstrapWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub service: Option<DispatchService>,
    pub error: Option<BootstrapError>,
}

impl BootstrapWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(StaticConfigLoader::new(Config::default())),
            reporter: Arc::new(RecordingHealthReporter::default()),
            service: None,
            error: None,
        }
    }

    pub fn use_stages(&mut self, stages: Vec<String>) {
        self.loader = Box::new(StaticConfigLoader::new(Config {
            stages,
            ..Config::default()
        }));
    }

    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.service.is_some() || self.error.is_some() {
            return;
        }

        let log = OrderLog::new();
        let registry = StageRegistry::new()
            .register("audit", move || log.stage("audit"));
        let collaborators = Collaborators::new(
            Arc::new(JsonPacker),
            Arc::new(echo_router(Arc::new(AtomicUsize::new(0)))),
        )
        .with_registry(registry)
        .with_events(Arc::new(RecordingPublisher::default()));

        match bootstrap_with(&*self.loader, self.reporter.clone(), collaborators) {
            Ok(service) => self.service = Some(service),
            Err(error) => self.error = Some(error),
        }
    }
}

pub fn dispatch_world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::new())
}

pub fn bootstrap_world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}
