//! Shared configuration for the RPC dispatch core.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an
//! optional TOML file named by `--config-path` (or `RPC_CONFIG_PATH`), then
//! `RPC_*` environment variables, and finally command-line flags. The only
//! dispatch-specific setting is the ordered list of configured stage
//! identifiers; everything else governs telemetry.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, default_log_filter, default_log_filter_string, default_log_format,
    default_stages,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for a dispatcher process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RPC")]
pub struct Config {
    /// `tracing` filter directive applied to the telemetry subscriber.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Ordered identifiers of caller-configured stages.
    #[serde(default = "default_stages")]
    #[ortho_config(default = default_stages())]
    pub stages: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            stages: default_stages(),
        }
    }
}

impl Config {
    /// Filter directive for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log events.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Configured stage identifiers in execution order.
    #[must_use]
    pub fn stages(&self) -> &[String] {
        self.stages.as_slice()
    }
}
