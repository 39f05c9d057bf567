//! Lock-step request/reply transport over Unix domain sockets.
//!
//! This is the lowest layer of stepmq. It provides exactly one messaging
//! style: strict request/reply alternation between a bound endpoint
//! ([`ReplySocket`]) and a connected endpoint ([`RequestSocket`]). A server
//! must answer each request before it can receive the next one; a client
//! must collect the reply to its last request before it can send again.
//! Violations are reported as [`TransportError::InvalidState`] rather than
//! silently reordering traffic.
//!
//! Endpoints are created from a shared [`Context`], a cheaply cloneable
//! handle carrying transport-wide options. Raw byte frames are
//! length-prefixed on the stream; callers only ever see complete frames.

pub mod codec;
pub mod context;
pub mod error;
pub mod reply;
pub mod request;

mod framed;
mod sys;

pub use codec::{FRAME_HEADER_SIZE, FRAME_MAGIC};
pub use context::{Context, ContextOptions};
pub use error::{Result, TransportError};
pub use reply::ReplySocket;
pub use request::RequestSocket;
