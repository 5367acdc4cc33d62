//! Contract with the hosting connection runtime.
//!
//! Accepting connections and framing bytes belong to the runtime. The
//! dispatcher only needs a handle it can write one response frame to.

use std::fmt;
use std::io;

/// Identifier of a connection within the runtime (a file descriptor or
/// equivalent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session or reactor identifier the runtime associates with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Writes response frames back to connections.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Writes one frame to the given connection.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the write fails. The dispatcher does
    /// not retry.
    fn send(&self, connection: ConnectionId, bytes: &[u8]) -> io::Result<()>;
}
