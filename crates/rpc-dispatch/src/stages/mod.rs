//! Stages provided by the crate.
//!
//! The fixed stages (`decode`, `route`, `validate`, `session`, and the
//! `handler` adapter) are placed by the pipeline builder. The authorisation
//! stage is a ready-made configured stage callers may register.

mod authorise;
mod decode;
mod handler_adapter;
mod route;
mod session;
mod validate;

pub use self::authorise::{AuthorisationStage, Authoriser, Decision};
pub use self::decode::DecodeStage;
pub use self::handler_adapter::HandlerAdapter;
pub use self::route::RouteStage;
pub use self::session::{ConnectionSessions, SessionContext, SessionResolver, SessionStage};
pub use self::validate::ValidationStage;
