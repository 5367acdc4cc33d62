//! Structured health reporting for dispatcher bootstrap.

use std::sync::Arc;

use rpc_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after the dispatcher has been assembled.
    fn bootstrap_succeeded(&self, config: &Config, stages: &[&str]);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config, stages: &[&str]) {
        (**self).bootstrap_succeeded(config, stages);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }
}

/// Reporter that records lifecycle events on the `rpc_dispatch::health`
/// target.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting dispatcher bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config, stages: &[&str]) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            configured = config.stages().len(),
            pipeline = %stages.join(" -> "),
            "dispatcher ready with {} stages",
            stages.len()
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "dispatcher bootstrap failed"
        );
    }
}
