//! Built-in defaults applied when no layer supplies a value.

use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Configured stages inserted between the fixed prologue and epilogue.
///
/// Empty: a dispatcher without configuration runs only the fixed stages.
pub fn default_stages() -> Vec<String> {
    Vec::new()
}
