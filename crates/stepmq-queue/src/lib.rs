//! Reliable at-least-once delivery between a producer and a consumer.
//!
//! This is the reliability core of stepmq. Two symmetric actors compose
//! around a shared [`Context`](stepmq_transport::Context):
//!
//! - [`Consumer`] (server role) binds a reply endpoint and runs
//!   poll → receive → acknowledge → dispatch on its own thread.
//! - [`Producer`] (client role) connects a request endpoint and runs
//!   drain-queue → send → await-reply → pop-or-retry on its own thread.
//!
//! Every transport fault on either side is absorbed locally: the endpoint
//! is torn down and rebuilt after a fixed delay, and the producer retries
//! the unacknowledged head of its queue until the round trip succeeds.
//! Callers never see an error from [`Producer::publish`]; delivery
//! confidence is entirely internal. The cost of this contract is
//! at-least-once semantics: if an acknowledgment is lost after the
//! consumer already dispatched, the resent message is dispatched again.

pub mod consumer;
pub mod error;
pub mod producer;
pub mod retry;

pub use consumer::{Consumer, MessageObserver};
pub use error::{QueueError, Result};
pub use producer::Producer;
pub use retry::{StopFlag, POLL_TIMEOUT, RECONNECT_DELAY};

pub use stepmq_transport::Context;
pub use stepmq_wire::{Message, MessageKind};
