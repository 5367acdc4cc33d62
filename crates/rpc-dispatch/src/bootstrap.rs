//! Dispatcher bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use rpc_config::Config;

use crate::dispatcher::Dispatcher;
use crate::events::{EventPublisher, TracingEventPublisher};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::packer::Packer;
use crate::pipeline::PipelineBuilder;
use crate::registry::{RegistryError, StageRegistry};
use crate::routing::Router;
use crate::stages::{ConnectionSessions, SessionResolver};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the dispatcher configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when a layer fails to parse or merge.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A configured stage identifier has no registered factory.
    #[error("failed to resolve configured stages: {source}")]
    Stages {
        /// Registry lookup failure.
        #[source]
        source: RegistryError,
    },
}

/// Caller-supplied collaborators the dispatcher is assembled from.
pub struct Collaborators {
    packer: Arc<dyn Packer>,
    router: Arc<dyn Router>,
    registry: StageRegistry,
    events: Arc<dyn EventPublisher>,
    sessions: Arc<dyn SessionResolver>,
}

impl Collaborators {
    /// Starts from a packer and router, with an empty stage registry,
    /// tracing-backed events and anonymous connection sessions.
    pub fn new(packer: Arc<dyn Packer>, router: Arc<dyn Router>) -> Self {
        Self {
            packer,
            router,
            registry: StageRegistry::new(),
            events: Arc::new(TracingEventPublisher),
            sessions: Arc::new(ConnectionSessions),
        }
    }

    /// Factories used to resolve the configured stage identifiers.
    #[must_use]
    pub fn with_registry(mut self, registry: StageRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Publisher receiving the lifecycle event of every dispatch.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    /// Resolver used by the session stage.
    #[must_use]
    pub fn with_session_resolver(mut self, sessions: Arc<dyn SessionResolver>) -> Self {
        self.sessions = sessions;
        self
    }
}

/// Result of a successful bootstrap invocation.
#[derive(Debug)]
pub struct DispatchService {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    telemetry: TelemetryHandle,
}

impl DispatchService {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared dispatcher to hand to the connection runtime.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps with the system configuration loader and the structured
/// health reporter.
///
/// # Errors
///
/// See [`bootstrap_with`].
pub fn bootstrap(collaborators: Collaborators) -> Result<DispatchService, BootstrapError> {
    bootstrap_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter),
        collaborators,
    )
}

/// Loads configuration, initialises telemetry, resolves the configured
/// stages and assembles the dispatcher.
///
/// The pipeline is built once here and shared by every dispatch.
///
/// # Errors
///
/// Returns a [`BootstrapError`] describing the first step that failed. The
/// failure is also passed to `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    collaborators: Collaborators,
) -> Result<DispatchService, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => return Err(fail(&*reporter, BootstrapError::Configuration { source })),
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => return Err(fail(&*reporter, BootstrapError::Telemetry { source })),
    };

    let Collaborators {
        packer,
        router,
        registry,
        events,
        sessions,
    } = collaborators;

    let configured = match registry.resolve(config.stages()) {
        Ok(stages) => stages,
        Err(source) => return Err(fail(&*reporter, BootstrapError::Stages { source })),
    };

    let pipeline = PipelineBuilder::new(Arc::clone(&packer), router)
        .session_resolver(sessions)
        .stages(configured)
        .build();
    reporter.bootstrap_succeeded(&config, &pipeline.stage_names());

    Ok(DispatchService {
        config,
        dispatcher: Arc::new(Dispatcher::new(pipeline, packer, events)),
        telemetry,
    })
}

fn fail(reporter: &dyn HealthReporter, error: BootstrapError) -> BootstrapError {
    reporter.bootstrap_failed(&error);
    error
}
