//! Route resolution stage.

use std::sync::Arc;

use crate::context::{Request, Response, keys};
use crate::errors::{DispatchError, PipelineError};
use crate::pipeline::{Next, Stage};
use crate::routing::{RouteKey, Router};

/// Resolves the decoded call to a route, stores it under [`keys::ROUTE`] and
/// readdresses the request to the call's real method and path.
pub struct RouteStage {
    router: Arc<dyn Router>,
}

impl RouteStage {
    /// Creates the stage.
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self { router }
    }
}

impl Stage for RouteStage {
    fn name(&self) -> &str {
        "route"
    }

    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let call = request.require(keys::CALL)?;
        let route = self
            .router
            .resolve(call)
            .ok_or_else(|| DispatchError::route_not_found(RouteKey::for_call(call).to_string()))?;

        let routed = request
            .with_target(call.method.as_str(), call.path())
            .with_attribute(keys::ROUTE, route);
        next.run(routed)
    }
}
