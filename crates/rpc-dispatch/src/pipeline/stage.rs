//! The stage capability and its continuation.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::PIPELINE_TARGET;
use crate::context::{Request, Response};
use crate::errors::{DispatchError, PipelineError};

/// One unit of the processing chain.
///
/// A stage may inspect or derive the request, call `next` to run the rest of
/// the chain, post-process the response it gets back, or return a response
/// of its own without calling `next` to short-circuit everything after it.
/// Failures are returned, never recovered locally; the dispatcher translates
/// them once at the pipeline boundary.
///
/// Stages are shared by every concurrent dispatch and must keep no
/// per-request state.
pub trait Stage: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Handles `request`, optionally delegating to `next`.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the stage, or anything it delegates
    /// to, fails.
    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError>;
}

/// Continuation invoking the remainder of the chain.
///
/// `run` consumes the continuation, so a stage can run the rest of the chain
/// at most once.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    outer: Option<Box<Next<'a>>>,
}

impl<'a> Next<'a> {
    pub(super) fn new(stages: &'a [Arc<dyn Stage>]) -> Self {
        Self {
            stages,
            outer: None,
        }
    }

    /// Runs the next stage with `request`.
    ///
    /// # Errors
    ///
    /// Propagates the first failure raised further down the chain, or
    /// `DispatchError::PipelineExhausted` when no stage is left to produce a
    /// response.
    pub fn run(self, request: Request) -> Result<Response, PipelineError> {
        let Self { stages, outer } = self;
        match stages.split_first() {
            Some((stage, rest)) => {
                trace!(target: PIPELINE_TARGET, stage = stage.name(), "entering stage");
                stage.handle(request, Next { stages: rest, outer })
            }
            None => match outer {
                Some(outer) => (*outer).run(request),
                None => Err(PipelineError::new(DispatchError::PipelineExhausted)),
            },
        }
    }

    /// Inserts `stages` ahead of the remaining chain.
    #[must_use]
    pub fn nest<'b>(self, stages: &'b [Arc<dyn Stage>]) -> Next<'b>
    where
        'a: 'b,
    {
        Next {
            stages,
            outer: Some(Box::new(self)),
        }
    }

    /// Number of stages still to run, including nested levels.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stages.len() + self.outer.as_ref().map_or(0, |outer| outer.remaining())
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Stage built from a closure.
pub struct FnStage<F> {
    name: String,
    handler: F,
}

impl<F> FnStage<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> Result<Response, PipelineError> + Send + Sync,
{
    /// Wraps `handler` under `name`.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> Result<Response, PipelineError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        (self.handler)(request, next)
    }
}

impl<F> fmt::Debug for FnStage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
