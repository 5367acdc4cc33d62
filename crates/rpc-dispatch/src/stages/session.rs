//! Caller context stage and route-level stages.

use std::sync::Arc;

use crate::context::{Request, Response, keys};
use crate::errors::{DispatchError, PipelineError};
use crate::pipeline::{Next, Stage};
use crate::transport::{ConnectionId, SessionId};

/// Identity of the caller behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Originating connection.
    pub connection_id: ConnectionId,
    /// Session reported by the connection runtime.
    pub session_id: SessionId,
    /// Authenticated principal, when a resolver established one.
    pub principal: Option<String>,
}

impl SessionContext {
    /// Anonymous context for the given connection and session.
    #[must_use]
    pub fn anonymous(connection_id: ConnectionId, session_id: SessionId) -> Self {
        Self {
            connection_id,
            session_id,
            principal: None,
        }
    }

    /// Returns a copy naming `principal`.
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }
}

/// Establishes the caller context for a request.
///
/// Session stores live outside this crate; resolvers adapt them.
pub trait SessionResolver: Send + Sync {
    /// Resolves the caller of `request`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Unauthenticated` when the caller cannot be
    /// identified, or any other failure raised by the backing store.
    fn resolve(&self, request: &Request) -> Result<SessionContext, DispatchError>;
}

/// Resolver deriving an anonymous context from the connection attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectionSessions;

impl SessionResolver for ConnectionSessions {
    fn resolve(&self, request: &Request) -> Result<SessionContext, DispatchError> {
        Ok(SessionContext::anonymous(
            *request.require(keys::CONNECTION_ID)?,
            *request.require(keys::SESSION_ID)?,
        ))
    }
}

/// Stores the caller context under [`keys::SESSION`], then runs the resolved
/// route's own stages ahead of the handler adapter.
pub struct SessionStage {
    resolver: Arc<dyn SessionResolver>,
}

impl SessionStage {
    /// Creates the stage.
    pub fn new(resolver: Arc<dyn SessionResolver>) -> Self {
        Self { resolver }
    }
}

impl Stage for SessionStage {
    fn name(&self) -> &str {
        "session"
    }

    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let session = self.resolver.resolve(&request)?;
        let route = Arc::clone(request.require(keys::ROUTE)?);
        let enriched = request.with_attribute(keys::SESSION, session);
        next.nest(route.stages()).run(enriched)
    }
}
