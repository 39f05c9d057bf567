//! Reliable request/reply messaging over a lock-step transport.
//!
//! stepmq turns a strict request/reply socket pair into an at-least-once
//! delivery channel: the producer queues outbound messages and retries
//! through reconnects until each one is acknowledged; the consumer
//! acknowledges every well-formed request before dispatching it.
//!
//! # Crate Structure
//!
//! - [`transport`] — Lock-step request/reply endpoints over Unix domain sockets
//! - [`wire`] — The message record and its binary codec
//! - [`queue`] — The reliability core: producer and consumer actors (behind the `queue` feature)

/// Re-export transport types.
pub mod transport {
    pub use stepmq_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use stepmq_wire::*;
}

/// Re-export the reliability actors (requires `queue` feature).
#[cfg(feature = "queue")]
pub mod queue {
    pub use stepmq_queue::*;
}
