//! Payload deserialisation stage.

use std::sync::Arc;

use crate::context::{Request, Response, keys};
use crate::errors::{DispatchError, PipelineError};
use crate::packer::Packer;
use crate::pipeline::{Next, Stage};

/// Decodes the raw payload into a [`ServiceCall`](crate::packer::ServiceCall)
/// stored under [`keys::CALL`].
pub struct DecodeStage {
    packer: Arc<dyn Packer>,
}

impl DecodeStage {
    /// Creates the stage.
    pub fn new(packer: Arc<dyn Packer>) -> Self {
        Self { packer }
    }
}

impl Stage for DecodeStage {
    fn name(&self) -> &str {
        "decode"
    }

    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let call = self
            .packer
            .unpack(request.require(keys::PAYLOAD)?)
            .map_err(DispatchError::malformed_payload)?;
        next.run(request.with_attribute(keys::CALL, call))
    }
}
