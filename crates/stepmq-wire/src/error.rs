/// Errors that can occur while decoding a message record.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before a complete record was read.
    #[error("truncated message (have {have} bytes, need {need})")]
    Truncated { have: usize, need: usize },

    /// The kind tag byte does not name a known message kind.
    #[error("unknown message kind tag {0:#04x}")]
    UnknownKind(u8),

    /// The acknowledgment flag byte was neither 0 nor 1.
    #[error("invalid ack flag byte {0:#04x}")]
    InvalidAckFlag(u8),

    /// Bytes remained after a complete record.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

pub type Result<T> = std::result::Result<T, WireError>;
