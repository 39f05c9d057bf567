use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Fixed portion of an encoded record: id (8) + kind (1) + ack (1) +
/// extension length (4) = 14 bytes.
pub const RECORD_HEADER_SIZE: usize = 14;

/// Protocol tag carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// An ordinary payload-bearing message.
    Message = 0,
    /// A message addressed to every consumer behind the endpoint.
    Broadcast = 1,
    /// An instruction to terminate the addressed worker.
    Kill = 2,
    /// A notification that the sender is going offline.
    Offline = 3,
}

impl MessageKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Message),
            1 => Ok(Self::Broadcast),
            2 => Ok(Self::Kill),
            3 => Ok(Self::Offline),
            other => Err(WireError::UnknownKind(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Broadcast => "broadcast",
            Self::Kill => "kill",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "broadcast" => Ok(Self::Broadcast),
            "kill" => Ok(Self::Kill),
            "offline" => Ok(Self::Offline),
            other => Err(format!("unknown message kind: {other}")),
        }
    }
}

/// The unit exchanged between producer and consumer.
///
/// Immutable once constructed; ownership transfers whole on queue push/pop
/// and on dispatch to an observer. The `extension` is opaque to the
/// protocol. A reply carries the same `id`, `kind`, and `extension` as the
/// request it answers, with `ack` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub kind: MessageKind,
    pub extension: Bytes,
    pub ack: bool,
}

impl Message {
    /// Construct a request record (`ack = false`).
    pub fn new(id: u64, kind: MessageKind, extension: impl Into<Bytes>) -> Self {
        Self {
            id,
            kind,
            extension: extension.into(),
            ack: false,
        }
    }

    /// Construct the acknowledgment reply to this request: same id, kind,
    /// and extension, with the ack flag set.
    pub fn ack_reply(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            extension: self.extension.clone(),
            ack: true,
        }
    }

    /// Total encoded size of this record.
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_SIZE + self.extension.len()
    }

    /// Append the encoded record to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u64_le(self.id);
        dst.put_u8(self.kind.as_u8());
        dst.put_u8(u8::from(self.ack));
        dst.put_u32_le(self.extension.len() as u32);
        dst.put_slice(&self.extension);
    }

    /// Encode the record into a freshly allocated buffer.
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut dst);
        dst.freeze()
    }

    /// Decode exactly one record from `buf`.
    ///
    /// The buffer must hold the record and nothing else; both truncation and
    /// trailing garbage are reported distinguishably.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < RECORD_HEADER_SIZE {
            return Err(WireError::Truncated {
                have: buf.len(),
                need: RECORD_HEADER_SIZE,
            });
        }

        let id = u64::from_le_bytes(buf[0..8].try_into().expect("slice length checked"));
        let kind = MessageKind::from_u8(buf[8])?;
        let ack = match buf[9] {
            0 => false,
            1 => true,
            other => return Err(WireError::InvalidAckFlag(other)),
        };
        let extension_len =
            u32::from_le_bytes(buf[10..14].try_into().expect("slice length checked")) as usize;

        let body = &buf[RECORD_HEADER_SIZE..];
        if body.len() < extension_len {
            return Err(WireError::Truncated {
                have: buf.len(),
                need: RECORD_HEADER_SIZE + extension_len,
            });
        }
        if body.len() > extension_len {
            return Err(WireError::TrailingBytes(body.len() - extension_len));
        }

        Ok(Self {
            id,
            kind,
            extension: Bytes::copy_from_slice(body),
            ack,
        })
    }
}
