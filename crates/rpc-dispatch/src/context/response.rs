//! Outbound result context.

use super::attributes::{AttributeKey, Attributes};

/// Reserved attribute holding the serialised bytes to write back.
pub const OUTPUT: AttributeKey<Vec<u8>> = AttributeKey::new("rpc.output");

/// Result of running a request through the pipeline.
///
/// Shares the immutable attribute model of [`Request`](super::Request); the
/// only attribute the dispatcher reads is [`OUTPUT`].
#[derive(Debug, Clone, Default)]
pub struct Response {
    attributes: Attributes,
}

impl Response {
    /// Creates a response with no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a response carrying the given output bytes.
    #[must_use]
    pub fn with_output_bytes(bytes: Vec<u8>) -> Self {
        Self::new().with_attribute(OUTPUT, bytes)
    }

    /// Full attribute bag.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Looks up a single attribute.
    #[must_use]
    pub fn attribute<T: 'static>(&self, key: AttributeKey<T>) -> Option<&T> {
        self.attributes.get(key)
    }

    /// Returns a copy of this response carrying `value` under `key`.
    #[must_use]
    pub fn with_attribute<T>(&self, key: AttributeKey<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            attributes: self.attributes.with(key, value),
        }
    }

    /// Returns a copy of this response carrying `bytes` as its output.
    #[must_use]
    pub fn with_output(&self, bytes: Vec<u8>) -> Self {
        self.with_attribute(OUTPUT, bytes)
    }

    /// Serialised output, if a stage has produced it.
    #[must_use]
    pub fn output(&self) -> Option<&[u8]> {
        self.attributes.get(OUTPUT).map(Vec::as_slice)
    }
}
