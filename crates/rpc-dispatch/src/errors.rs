//! Error types for pipeline failures.
//!
//! Stages report failure by returning a [`PipelineError`]: a classified
//! [`DispatchError`] paired with the source location that raised it. The
//! error translator turns either into the wire-level error envelope; stages
//! never build that envelope themselves.

use std::panic::Location;

use thiserror::Error;

use crate::packer::PackError;

/// Numeric classifications carried in the envelope `code` field.
pub mod codes {
    /// Successful call.
    pub const OK: i32 = 0;
    /// Arguments rejected by validation.
    pub const INVALID_ARGUMENTS: i32 = 400;
    /// No caller identity could be established.
    pub const UNAUTHENTICATED: i32 = 401;
    /// No route matches the requested service method.
    pub const NOT_FOUND: i32 = 404;
    /// Failure without a more specific classification.
    pub const UNCLASSIFIED: i32 = 500;
}

/// Failure kinds raised while running the pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload could not be decoded into a service call.
    #[error("malformed payload: {source}")]
    MalformedPayload {
        /// Decoder error.
        #[source]
        source: PackError,
    },

    /// No route is registered for the requested service method.
    #[error("route not found: {target}")]
    RouteNotFound {
        /// Requested route, rendered as `interface::method@version`.
        target: String,
    },

    /// Call arguments failed validation.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// First violation found by the validator.
        message: String,
    },

    /// The caller could not be identified.
    #[error("unauthenticated: {message}")]
    Unauthenticated {
        /// Why no identity could be established.
        message: String,
    },

    /// The business handler failed.
    #[error("{message}")]
    Handler {
        /// Description supplied by the handler.
        message: String,
        /// Classification supplied by the handler, if any.
        code: Option<i32>,
    },

    /// The chain completed without any stage producing output bytes.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// A stage invoked `next` past the terminal adapter.
    #[error("pipeline exhausted without a terminal response")]
    PipelineExhausted,

    /// An attribute an earlier stage should have set is absent.
    #[error("missing request attribute: {name}")]
    MissingAttribute {
        /// Name of the absent attribute.
        name: &'static str,
    },

    /// A successful result could not be serialised.
    #[error("failed to pack response: {source}")]
    PackResponse {
        /// Encoder error.
        #[source]
        source: PackError,
    },

    /// A stage panicked.
    #[error("stage panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl DispatchError {
    /// Classification for the envelope `code` field, if this kind has one.
    ///
    /// Kinds without a classification are reported with
    /// [`codes::UNCLASSIFIED`] by [`DispatchError::code_or_default`].
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::RouteNotFound { .. } => Some(codes::NOT_FOUND),
            Self::InvalidArguments { .. } => Some(codes::INVALID_ARGUMENTS),
            Self::Unauthenticated { .. } => Some(codes::UNAUTHENTICATED),
            Self::Handler { code, .. } => *code,
            Self::MalformedPayload { .. }
            | Self::InvalidResponse { .. }
            | Self::PipelineExhausted
            | Self::MissingAttribute { .. }
            | Self::PackResponse { .. }
            | Self::Panicked { .. }
            | Self::Internal { .. } => None,
        }
    }

    /// Classification, falling back to [`codes::UNCLASSIFIED`].
    pub fn code_or_default(&self) -> i32 {
        self.code().unwrap_or(codes::UNCLASSIFIED)
    }

    /// Creates a malformed payload error.
    pub fn malformed_payload(source: PackError) -> Self {
        Self::MalformedPayload { source }
    }

    /// Creates a route not found error.
    pub fn route_not_found(target: impl Into<String>) -> Self {
        Self::RouteNotFound {
            target: target.into(),
        }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates an unclassified handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            code: None,
        }
    }

    /// Creates a handler error with an explicit classification.
    pub fn handler_with_code(message: impl Into<String>, code: i32) -> Self {
        Self::Handler {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a missing attribute error.
    pub fn missing_attribute(name: &'static str) -> Self {
        Self::MissingAttribute { name }
    }

    /// Creates a response packing error.
    pub fn pack_response(source: PackError) -> Self {
        Self::PackResponse { source }
    }

    /// Creates a panic error.
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// A [`DispatchError`] tagged with the location that raised it.
///
/// Construct it with [`PipelineError::new`] or let `?` convert a
/// `DispatchError`; both record the caller's location.
#[derive(Debug, Error)]
#[error("{error} {location}")]
pub struct PipelineError {
    #[source]
    error: DispatchError,
    location: &'static Location<'static>,
}

impl PipelineError {
    /// Wraps `error`, recording the caller's source location.
    #[track_caller]
    pub fn new(error: DispatchError) -> Self {
        Self::at(error, Location::caller())
    }

    /// Wraps `error` with an explicit source location.
    pub fn at(error: DispatchError, location: &'static Location<'static>) -> Self {
        Self { error, location }
    }

    /// Classified failure kind.
    pub fn error(&self) -> &DispatchError {
        &self.error
    }

    /// Consumes the wrapper, returning the classified failure.
    pub fn into_error(self) -> DispatchError {
        self.error
    }

    /// Source location that raised the failure.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Classification, falling back to [`codes::UNCLASSIFIED`].
    pub fn code(&self) -> i32 {
        self.error.code_or_default()
    }
}

impl From<DispatchError> for PipelineError {
    #[track_caller]
    fn from(error: DispatchError) -> Self {
        Self::new(error)
    }
}
