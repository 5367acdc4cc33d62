//! Terminal adapter invoking the resolved business handler.

use std::sync::Arc;

use crate::context::{Request, Response, keys};
use crate::envelope::Envelope;
use crate::errors::{DispatchError, PipelineError};
use crate::packer::Packer;
use crate::pipeline::{Next, Stage};

/// Calls the route's handler with the decoded arguments and packs the result
/// into a success envelope as the response output.
///
/// Always the last stage; it never calls `next`.
pub struct HandlerAdapter {
    packer: Arc<dyn Packer>,
}

impl HandlerAdapter {
    /// Creates the adapter.
    pub fn new(packer: Arc<dyn Packer>) -> Self {
        Self { packer }
    }
}

impl Stage for HandlerAdapter {
    fn name(&self) -> &str {
        "handler"
    }

    fn handle(&self, request: Request, _next: Next<'_>) -> Result<Response, PipelineError> {
        let route = request.require(keys::ROUTE)?;
        let call = request.require(keys::CALL)?;

        let data = route.handler().invoke(&request, &call.params)?;
        let bytes = self
            .packer
            .pack(&Envelope::success(data))
            .map_err(DispatchError::pack_response)?;
        Ok(Response::with_output_bytes(bytes))
    }
}
