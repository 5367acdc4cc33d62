//! Assembly of the fixed pipeline shape around configured stages.

use std::sync::Arc;

use super::executor::Pipeline;
use super::stage::Stage;
use crate::packer::Packer;
use crate::routing::Router;
use crate::stages::{
    ConnectionSessions, DecodeStage, HandlerAdapter, RouteStage, SessionResolver, SessionStage,
    ValidationStage,
};

/// Builds a [`Pipeline`] with the fixed shape
/// `decode → route → <configured…> → validate → session → handler`.
///
/// Configured stages can only be appended to the middle section; the
/// prologue, epilogue and terminal adapter are always placed by
/// [`build`](Self::build).
pub struct PipelineBuilder {
    packer: Arc<dyn Packer>,
    router: Arc<dyn Router>,
    sessions: Arc<dyn SessionResolver>,
    configured: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    /// Starts a builder using `packer` for decoding and response encoding and
    /// `router` for route resolution.
    pub fn new(packer: Arc<dyn Packer>, router: Arc<dyn Router>) -> Self {
        Self {
            packer,
            router,
            sessions: Arc::new(ConnectionSessions),
            configured: Vec::new(),
        }
    }

    /// Replaces the resolver the session stage uses to identify callers.
    #[must_use]
    pub fn session_resolver(mut self, resolver: Arc<dyn SessionResolver>) -> Self {
        self.sessions = resolver;
        self
    }

    /// Appends one configured stage.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.configured.push(stage);
        self
    }

    /// Appends configured stages in iteration order.
    #[must_use]
    pub fn stages(mut self, stages: impl IntoIterator<Item = Arc<dyn Stage>>) -> Self {
        self.configured.extend(stages);
        self
    }

    /// Assembles the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let Self {
            packer,
            router,
            sessions,
            configured,
        } = self;

        let prologue: [Arc<dyn Stage>; 2] = [
            Arc::new(DecodeStage::new(Arc::clone(&packer))),
            Arc::new(RouteStage::new(router)),
        ];
        let epilogue: [Arc<dyn Stage>; 2] = [
            Arc::new(ValidationStage::new()),
            Arc::new(SessionStage::new(sessions)),
        ];
        let terminal: Arc<dyn Stage> = Arc::new(HandlerAdapter::new(packer));

        let mut stages = Vec::with_capacity(prologue.len() + configured.len() + epilogue.len() + 1);
        stages.extend(prologue);
        stages.extend(configured);
        stages.extend(epilogue);
        stages.push(terminal);
        Pipeline::from_stages(stages)
    }
}
