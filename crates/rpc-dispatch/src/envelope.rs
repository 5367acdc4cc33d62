//! The `{data, message, code}` envelope written back to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::codes;

/// Uniform response shape for successful and failed calls alike.
///
/// Callers distinguish failures by inspecting `code` and `message`; a failed
/// call carries an empty string in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Result payload, or `""` on failure.
    pub data: Value,
    /// Human-readable failure description, empty on success.
    pub message: String,
    /// Numeric classification, [`codes::OK`] on success.
    pub code: i32,
}

impl Envelope {
    /// Wraps a successful result.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            data,
            message: String::new(),
            code: codes::OK,
        }
    }

    /// Builds a failure envelope with empty data.
    pub fn failure(message: impl Into<String>, code: i32) -> Self {
        Self {
            data: Value::String(String::new()),
            message: message.into(),
            code,
        }
    }

    /// Whether the envelope reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == codes::OK
    }
}
