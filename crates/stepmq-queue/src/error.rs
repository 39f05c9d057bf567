use std::time::Duration;

/// Errors that can occur inside the reliability actors.
///
/// These never cross an actor boundary to callers; they are logged at the
/// loop that recovers from them.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Transport-level fault (bind, connect, poll, send, receive).
    #[error("transport error: {0}")]
    Transport(#[from] stepmq_transport::TransportError),

    /// Malformed inbound payload.
    #[error("wire error: {0}")]
    Wire(#[from] stepmq_wire::WireError),

    /// No reply arrived within the bounded poll window.
    #[error("no reply within {0:?}")]
    ReplyTimeout(Duration),

    /// The peer answered with a well-formed reply that does not
    /// acknowledge the request.
    #[error("peer refused message {id}")]
    Refused { id: u64 },

    /// The actor's worker thread could not be spawned.
    #[error("worker thread spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;
