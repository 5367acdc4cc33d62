//! Inbound call context.

use super::attributes::{AttributeKey, Attributes};
use crate::errors::DispatchError;

/// Method recorded before the route stage resolves the real target.
pub const PLACEHOLDER_METHOD: &str = "get";

/// Path recorded before the route stage resolves the real target.
pub const PLACEHOLDER_PATH: &str = "/";

/// One inbound call.
///
/// A request is never mutated after construction: every `with_*` method
/// returns a new value and leaves the receiver as it was, so a request can be
/// handed to several derivations without any of them observing the others.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    path: String,
    attributes: Attributes,
}

impl Request {
    /// Creates a request for the given nominal target with no attributes.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            attributes: Attributes::new(),
        }
    }

    /// Creates a request addressed to the placeholder target.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_METHOD, PLACEHOLDER_PATH)
    }

    /// Nominal method identifier.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Nominal path identifier.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
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

    /// Looks up an attribute that an earlier stage must have set.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MissingAttribute` when the key is absent.
    pub fn require<T: 'static>(&self, key: AttributeKey<T>) -> Result<&T, DispatchError> {
        self.attributes
            .get(key)
            .ok_or_else(|| DispatchError::missing_attribute(key.name()))
    }

    /// Returns a copy of this request carrying `value` under `key`.
    #[must_use]
    pub fn with_attribute<T>(&self, key: AttributeKey<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            attributes: self.attributes.with(key, value),
        }
    }

    /// Returns a copy of this request addressed to a new target.
    #[must_use]
    pub fn with_target(&self, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            attributes: self.attributes.clone(),
        }
    }
}
