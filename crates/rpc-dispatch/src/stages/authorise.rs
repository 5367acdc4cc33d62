//! Ready-made authorisation stage for configured pipelines.

use std::sync::Arc;

use serde_json::json;

use crate::context::{Request, Response, keys};
use crate::envelope::Envelope;
use crate::errors::{DispatchError, PipelineError};
use crate::pipeline::{Next, Stage};

/// Outcome of an authorisation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The call proceeds down the chain.
    Allow,
    /// The call is answered immediately with a denial.
    Deny {
        /// Reason reported to the caller.
        reason: String,
    },
}

impl Decision {
    /// Denial with the given reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }
}

/// Policy consulted by [`AuthorisationStage`].
pub trait Authoriser: Send + Sync {
    /// Decides whether `request` may proceed.
    ///
    /// # Errors
    ///
    /// Returns an error when the policy cannot be evaluated. A refusal is a
    /// [`Decision::Deny`], not an error.
    fn authorise(&self, request: &Request) -> Result<Decision, DispatchError>;
}

impl<F> Authoriser for F
where
    F: Fn(&Request) -> Result<Decision, DispatchError> + Send + Sync,
{
    fn authorise(&self, request: &Request) -> Result<Decision, DispatchError> {
        self(request)
    }
}

/// Short-circuits denied calls with a success envelope carrying
/// `{"allowed": false, "reason": ...}`.
///
/// A denial is an application-level outcome, so it is answered as data rather
/// than raised as a failure. Later stages, including the handler, never run.
pub struct AuthorisationStage {
    authoriser: Arc<dyn Authoriser>,
}

impl AuthorisationStage {
    /// Creates the stage around `authoriser`.
    pub fn new(authoriser: Arc<dyn Authoriser>) -> Self {
        Self { authoriser }
    }
}

impl Stage for AuthorisationStage {
    fn name(&self) -> &str {
        "authorise"
    }

    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        match self.authoriser.authorise(&request)? {
            Decision::Allow => next.run(request),
            Decision::Deny { reason } => {
                let packer = request.require(keys::PACKER)?;
                let denial = Envelope::success(json!({ "allowed": false, "reason": reason }));
                let bytes = packer
                    .pack(&denial)
                    .map_err(DispatchError::pack_response)?;
                Ok(Response::with_output_bytes(bytes))
            }
        }
    }
}
