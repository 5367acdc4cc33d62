//! Wire codec contract and the JSON reference codec.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::envelope::Envelope;

/// Version assumed when a call omits one.
pub const DEFAULT_VERSION: &str = "0";

/// Decoded service call carried by an inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    /// Service interface name, for example `demo.Echo`.
    pub interface: String,
    /// Interface version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Method within the interface.
    pub method: String,
    /// Positional arguments.
    #[serde(default)]
    pub params: Vec<Value>,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_owned()
}

impl ServiceCall {
    /// Creates a call against version [`DEFAULT_VERSION`].
    pub fn new(
        interface: impl Into<String>,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        Self {
            interface: interface.into(),
            version: default_version(),
            method: method.into(),
            params,
        }
    }

    /// Path identifying the interface and version, `/<interface>/<version>`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}/{}", self.interface, self.version)
    }
}

/// Errors raised by a [`Packer`].
#[derive(Debug, Error)]
pub enum PackError {
    /// The payload was empty.
    #[error("empty payload")]
    Empty,
    /// The payload could not be decoded.
    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),
    /// The value could not be encoded.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
    /// Codec-specific failure.
    #[error("{message}")]
    Codec {
        /// Codec-supplied description.
        message: String,
    },
}

impl PackError {
    /// Creates a codec-specific error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}

/// Serialises envelopes to wire bytes and decodes inbound calls.
///
/// Implementations are shared by every concurrent dispatch and must not keep
/// per-call state.
#[cfg_attr(test, mockall::automock)]
pub trait Packer: Send + Sync {
    /// Encodes an envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be encoded.
    fn pack(&self, envelope: &Envelope) -> Result<Vec<u8>, PackError>;

    /// Decodes an inbound payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid service call.
    fn unpack(&self, payload: &[u8]) -> Result<ServiceCall, PackError>;
}

/// JSON codec backed by `serde_json`.
///
/// Framing is the transport's concern; payloads are single JSON documents
/// with optional trailing whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPacker;

impl JsonPacker {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Packer for JsonPacker {
    fn pack(&self, envelope: &Envelope) -> Result<Vec<u8>, PackError> {
        serde_json::to_vec(envelope).map_err(PackError::Encode)
    }

    fn unpack(&self, payload: &[u8]) -> Result<ServiceCall, PackError> {
        let trimmed = trim_trailing_whitespace(payload);
        if trimmed.is_empty() {
            return Err(PackError::Empty);
        }
        serde_json::from_slice(trimmed).map_err(PackError::Decode)
    }
}

/// Trims trailing ASCII whitespace from a byte slice.
fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}
