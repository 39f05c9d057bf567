use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the reply endpoint.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect the request endpoint.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A frame header carried the wrong magic bytes.
    #[error("invalid frame magic (expected 0x5351 \"SQ\")")]
    BadMagic,

    /// A frame payload exceeds the configured maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The peer closed the connection mid-conversation.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A receive or send was attempted with no peer connected.
    #[error("no peer connected")]
    NotConnected,

    /// Lock-step violation: the endpoint must perform the named
    /// operation next.
    #[error("lock-step violation: endpoint must {expected} next")]
    InvalidState { expected: &'static str },
}

pub type Result<T> = std::result::Result<T, TransportError>;
