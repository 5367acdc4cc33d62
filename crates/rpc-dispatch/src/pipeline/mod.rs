//! Stage chain assembly and execution.
//!
//! A pipeline is an ordered list of [`Stage`] values. The builder pins the
//! fixed prologue, epilogue and terminal adapter around the caller's stages;
//! the executor threads each request through the list as a chain of
//! continuations.

mod builder;
mod executor;
mod stage;

pub use self::builder::PipelineBuilder;
pub use self::executor::{Pipeline, execute};
pub use self::stage::{FnStage, Next, Stage};

/// Tracing target for pipeline execution.
pub(crate) const PIPELINE_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::pipeline");
