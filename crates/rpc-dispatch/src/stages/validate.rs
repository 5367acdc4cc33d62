//! Argument and response validation stage.

use crate::context::{Request, Response, keys};
use crate::errors::{DispatchError, PipelineError};
use crate::pipeline::{Next, Stage};

/// Runs the route's argument validator before the rest of the chain and
/// checks that the chain produced output bytes on the way back.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationStage;

impl ValidationStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Stage for ValidationStage {
    fn name(&self) -> &str {
        "validate"
    }

    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        {
            let route = request.require(keys::ROUTE)?;
            let call = request.require(keys::CALL)?;
            if let Some(validator) = route.validator() {
                validator.validate(&call.params)?;
            }
        }

        let response = next.run(request)?;
        if response.output().is_none() {
            return Err(PipelineError::new(DispatchError::invalid_response(
                "handler produced no output",
            )));
        }
        Ok(response)
    }
}
