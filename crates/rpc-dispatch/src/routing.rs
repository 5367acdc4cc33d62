//! Route resolution contract and the in-memory route table.
//!
//! A route binds a `(interface, version, method)` triple to the business
//! handler the terminal adapter invokes, together with the optional argument
//! validator and route-level stages the epilogue applies.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Request;
use crate::errors::DispatchError;
use crate::packer::{DEFAULT_VERSION, ServiceCall};
use crate::pipeline::Stage;

/// Business logic bound to a route.
pub trait ServiceHandler: Send + Sync {
    /// Invokes the handler with the call's positional arguments.
    ///
    /// # Errors
    ///
    /// Returns an error when the call fails. Business outcomes such as "not
    /// found" should be returned as ordinary data instead.
    fn invoke(&self, request: &Request, params: &[Value]) -> Result<Value, DispatchError>;
}

impl<F> ServiceHandler for F
where
    F: Fn(&Request, &[Value]) -> Result<Value, DispatchError> + Send + Sync,
{
    fn invoke(&self, request: &Request, params: &[Value]) -> Result<Value, DispatchError> {
        self(request, params)
    }
}

/// Checks call arguments before the handler runs.
pub trait ArgumentValidator: Send + Sync {
    /// Validates positional arguments.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidArguments` describing the first
    /// violation.
    fn validate(&self, params: &[Value]) -> Result<(), DispatchError>;
}

impl<F> ArgumentValidator for F
where
    F: Fn(&[Value]) -> Result<(), DispatchError> + Send + Sync,
{
    fn validate(&self, params: &[Value]) -> Result<(), DispatchError> {
        self(params)
    }
}

/// Validator accepting an inclusive range of argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    min: usize,
    max: usize,
}

impl Arity {
    /// Accepts exactly `count` arguments.
    #[must_use]
    pub const fn exactly(count: usize) -> Self {
        Self {
            min: count,
            max: count,
        }
    }

    /// Accepts between `min` and `max` arguments inclusive.
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl ArgumentValidator for Arity {
    fn validate(&self, params: &[Value]) -> Result<(), DispatchError> {
        let count = params.len();
        if count < self.min || count > self.max {
            let expected = if self.min == self.max {
                self.min.to_string()
            } else {
                format!("{}..={}", self.min, self.max)
            };
            return Err(DispatchError::invalid_arguments(format!(
                "expected {expected} argument(s), got {count}"
            )));
        }
        Ok(())
    }
}

/// Identity of a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    /// Service interface name.
    pub interface: String,
    /// Interface version.
    pub version: String,
    /// Method name.
    pub method: String,
}

impl RouteKey {
    /// Creates a key for the given interface version and method.
    pub fn new(
        interface: impl Into<String>,
        version: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            version: version.into(),
            method: method.into(),
        }
    }

    /// Key addressed by a decoded call.
    #[must_use]
    pub fn for_call(call: &ServiceCall) -> Self {
        Self::new(
            call.interface.as_str(),
            call.version.as_str(),
            call.method.as_str(),
        )
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}@{}", self.interface, self.method, self.version)
    }
}

/// A resolved service method.
pub struct Route {
    key: RouteKey,
    handler: Arc<dyn ServiceHandler>,
    validator: Option<Arc<dyn ArgumentValidator>>,
    stages: Vec<Arc<dyn Stage>>,
}

impl Route {
    /// Binds `handler` to `key`.
    pub fn new(key: RouteKey, handler: impl ServiceHandler + 'static) -> Self {
        Self {
            key,
            handler: Arc::new(handler),
            validator: None,
            stages: Vec::new(),
        }
    }

    /// Binds `handler` to a method of `interface` at [`DEFAULT_VERSION`].
    pub fn method(
        interface: impl Into<String>,
        method: impl Into<String>,
        handler: impl ServiceHandler + 'static,
    ) -> Self {
        Self::new(RouteKey::new(interface, DEFAULT_VERSION, method), handler)
    }

    /// Attaches an argument validator run by the validation stage.
    #[must_use]
    pub fn with_validator(mut self, validator: impl ArgumentValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Appends a route-level stage, run after the epilogue and before the
    /// handler.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Route identity.
    #[must_use]
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    /// Business handler.
    #[must_use]
    pub fn handler(&self) -> &dyn ServiceHandler {
        self.handler.as_ref()
    }

    /// Argument validator, if any.
    #[must_use]
    pub fn validator(&self) -> Option<&dyn ArgumentValidator> {
        self.validator.as_deref()
    }

    /// Route-level stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("key", &self.key)
            .field("validated", &self.validator.is_some())
            .field(
                "stages",
                &self.stages.iter().map(|stage| stage.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Resolves decoded calls to routes.
///
/// Shared read-only by every concurrent dispatch.
pub trait Router: Send + Sync {
    /// Returns the route for `call`, or `None` when nothing matches.
    fn resolve(&self, call: &ServiceCall) -> Option<Arc<Route>>;
}

/// Router backed by a hash map, populated before dispatching starts.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<RouteKey, Arc<Route>>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route, returning any route previously bound to its key.
    pub fn insert(&mut self, route: Route) -> Option<Arc<Route>> {
        self.routes.insert(route.key().clone(), Arc::new(route))
    }

    /// Registers a route, builder style.
    #[must_use]
    pub fn with_route(mut self, route: Route) -> Self {
        self.insert(route);
        self
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Router for RouteTable {
    fn resolve(&self, call: &ServiceCall) -> Option<Arc<Route>> {
        self.routes.get(&RouteKey::for_call(call)).cloned()
    }
}
