//! Conversion of pipeline failures into error envelopes.

use std::sync::Arc;

use tracing::warn;

use crate::context::Response;
use crate::dispatcher::DISPATCH_TARGET;
use crate::envelope::Envelope;
use crate::errors::PipelineError;
use crate::packer::{PackError, Packer};

/// Turns an unhandled [`PipelineError`] into a response carrying a packed
/// error envelope.
///
/// The envelope has empty `data`, a `message` made of the failure description
/// followed by its source location, and the failure's classification code.
#[derive(Clone)]
pub struct ErrorTranslator {
    packer: Arc<dyn Packer>,
}

impl ErrorTranslator {
    /// Creates a translator serialising envelopes with `packer`.
    pub fn new(packer: Arc<dyn Packer>) -> Self {
        Self { packer }
    }

    /// Builds the envelope for `failure` without serialising it.
    #[must_use]
    pub fn envelope(failure: &PipelineError) -> Envelope {
        Envelope::failure(failure.to_string(), failure.code())
    }

    /// Translates `failure` into a response whose output is the packed
    /// envelope.
    ///
    /// # Errors
    ///
    /// Returns the packer's error when the envelope cannot be serialised. No
    /// fallback encoding is attempted.
    pub fn translate(&self, failure: &PipelineError) -> Result<Response, PackError> {
        let envelope = Self::envelope(failure);
        warn!(
            target: DISPATCH_TARGET,
            code = envelope.code,
            location = %failure.location(),
            error = %failure.error(),
            "dispatch failed"
        );
        let bytes = self.packer.pack(&envelope)?;
        Ok(Response::with_output_bytes(bytes))
    }
}
