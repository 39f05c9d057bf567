//! Message record and binary wire codec.
//!
//! The unit exchanged between producer and consumer is a [`Message`]: an
//! opaque correlation id, a protocol tag ([`MessageKind`]), an opaque
//! extension payload, and an acknowledgment flag that is set only on
//! replies. The codec fails distinguishably on malformed input so the
//! reliability layer can tell a garbled frame from a transport fault.

pub mod error;
pub mod message;

pub use error::{Result, WireError};
pub use message::{Message, MessageKind};
