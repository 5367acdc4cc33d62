//! Single-pass execution of a built stage list.

use std::fmt;
use std::sync::Arc;

use super::stage::{Next, Stage};
use crate::context::{Request, Response};
use crate::errors::PipelineError;

/// Runs `request` through `stages` once, in order.
///
/// Each stage receives a continuation over the stages after it. Failures
/// propagate unchanged; the executor performs no recovery.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by a stage.
pub fn execute(request: Request, stages: &[Arc<dyn Stage>]) -> Result<Response, PipelineError> {
    Next::new(stages).run(request)
}

/// An assembled, immutable stage list.
///
/// Built once by [`PipelineBuilder`](super::PipelineBuilder) and shared by
/// every dispatch.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub(super) fn from_stages(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Runs `request` through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by a stage.
    pub fn handle(&self, request: Request) -> Result<Response, PipelineError> {
        execute(request, &self.stages)
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::context::AttributeKey;
    use crate::errors::{DispatchError, codes};
    use crate::pipeline::FnStage;
    use crate::testing::{OrderLog, counting_stage};

    const MARK: AttributeKey<&'static str> = AttributeKey::new("mark");

    fn terminal() -> Arc<dyn Stage> {
        Arc::new(FnStage::new("terminal", |request: Request, _next: Next<'_>| {
            let mark = request.attribute(MARK).copied().unwrap_or("none");
            Ok(Response::with_output_bytes(mark.as_bytes().to_vec()))
        }))
    }

    #[test]
    fn runs_stages_in_order() {
        let log = OrderLog::new();
        let stages = vec![log.stage("a"), log.stage("b"), log.stage("c"), terminal()];

        execute(Request::placeholder(), &stages).expect("pipeline succeeds");
        assert_eq!(log.entries(), ["a", "b", "c"]);
    }

    #[test]
    fn derived_request_reaches_later_stages() {
        let marker: Arc<dyn Stage> = Arc::new(FnStage::new(
            "mark",
            |request: Request, next: Next<'_>| next.run(request.with_attribute(MARK, "set")),
        ));
        let response = execute(Request::placeholder(), &[marker, terminal()]).expect("succeeds");
        assert_eq!(response.output(), Some(&b"set"[..]));
    }

    #[test]
    fn short_circuit_skips_remaining_stages() {
        let (after, after_count) = counting_stage("after");
        let (terminal_stage, terminal_count) = counting_stage("terminal");
        let short: Arc<dyn Stage> = Arc::new(FnStage::new(
            "short",
            |_request: Request, _next: Next<'_>| Ok(Response::with_output_bytes(b"early".to_vec())),
        ));

        let response = execute(Request::placeholder(), &[short, after, terminal_stage])
            .expect("short circuit succeeds");

        assert_eq!(response.output(), Some(&b"early"[..]));
        assert_eq!(after_count.load(Ordering::SeqCst), 0);
        assert_eq!(terminal_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failure_propagates_without_recovery() {
        let (after, after_count) = counting_stage("after");
        let failing: Arc<dyn Stage> = Arc::new(FnStage::new(
            "fail",
            |_request: Request, _next: Next<'_>| {
                Err(PipelineError::new(DispatchError::handler_with_code("nope", 409)))
            },
        ));

        let error = execute(Request::placeholder(), &[failing, after, terminal()])
            .expect_err("failure propagates");

        assert_eq!(error.code(), 409);
        assert_eq!(after_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exhausted_chain_is_an_error() {
        let (pass, _count) = counting_stage("pass");
        let error = execute(Request::placeholder(), &[pass]).expect_err("no terminal stage");

        assert!(matches!(error.error(), DispatchError::PipelineExhausted));
        assert_eq!(error.code(), codes::UNCLASSIFIED);
    }

    #[test]
    fn nested_stages_run_before_the_outer_remainder() {
        let log = OrderLog::new();
        let inner = vec![log.stage("inner-1"), log.stage("inner-2")];
        let nesting: Arc<dyn Stage> = Arc::new(FnStage::new(
            "nest",
            move |request: Request, next: Next<'_>| next.nest(&inner).run(request),
        ));
        let stages = vec![log.stage("outer"), nesting, log.stage("after"), terminal()];

        execute(Request::placeholder(), &stages).expect("nested pipeline succeeds");
        assert_eq!(log.entries(), ["outer", "inner-1", "inner-2", "after"]);
    }

    #[test]
    fn reports_stage_names() {
        let log = OrderLog::new();
        let pipeline = Pipeline::from_stages(vec![log.stage("one"), terminal()]);
        assert_eq!(pipeline.stage_names(), ["one", "terminal"]);
        assert_eq!(pipeline.len(), 2);
    }
}
