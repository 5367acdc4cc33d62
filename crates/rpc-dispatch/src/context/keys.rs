//! Attribute keys populated by the dispatcher and the fixed stages.

use std::sync::Arc;

use super::AttributeKey;
use crate::packer::{Packer, ServiceCall};
use crate::routing::Route;
use crate::stages::SessionContext;
use crate::transport::{ConnectionId, SessionId, Transport};

/// Connection handle the response is written to.
pub const CONNECTION: AttributeKey<Arc<dyn Transport>> = AttributeKey::new("rpc.connection");

/// Identifier of the originating connection.
pub const CONNECTION_ID: AttributeKey<ConnectionId> = AttributeKey::new("rpc.connection_id");

/// Session (reactor) identifier reported by the connection runtime.
pub const SESSION_ID: AttributeKey<SessionId> = AttributeKey::new("rpc.session_id");

/// Raw frame payload.
pub const PAYLOAD: AttributeKey<Arc<[u8]>> = AttributeKey::new("rpc.payload");

/// Packer used to decode the payload and encode envelopes.
pub const PACKER: AttributeKey<Arc<dyn Packer>> = AttributeKey::new("rpc.packer");

/// Decoded service call, set by the decode stage.
pub const CALL: AttributeKey<ServiceCall> = AttributeKey::new("rpc.call");

/// Resolved route, set by the route stage.
pub const ROUTE: AttributeKey<Arc<Route>> = AttributeKey::new("rpc.route");

/// Caller identity, set by the session stage.
pub const SESSION: AttributeKey<SessionContext> = AttributeKey::new("rpc.session");
