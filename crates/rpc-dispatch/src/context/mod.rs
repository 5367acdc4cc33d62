//! Request and response contexts carried through the pipeline.
//!
//! Both contexts wrap an immutable [`Attributes`] bag. Well-known keys used by
//! the fixed stages live in [`keys`].

mod attributes;
pub mod keys;
mod request;
mod response;

pub use self::attributes::{AttributeKey, Attributes};
pub use self::request::{PLACEHOLDER_METHOD, PLACEHOLDER_PATH, Request};
pub use self::response::{OUTPUT, Response};
