use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Frame header: magic (2) + length (4) = 6 bytes.
pub const FRAME_HEADER_SIZE: usize = 6;

/// Magic bytes: "SQ" (0x53 0x51).
pub const FRAME_MAGIC: [u8; 2] = [0x53, 0x51];

/// Encode one raw frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬────────────┬──────────────────┐
/// │ Magic (2B)   │ Length     │ Payload          │
/// │ 0x53 0x51    │ (4B LE)    │ (Length bytes)   │
/// └──────────────┴────────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], max_payload: usize, dst: &mut BytesMut) -> Result<()> {
    if payload.len() > max_payload {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            max: max_payload,
        });
    }
    dst.reserve(FRAME_HEADER_SIZE + payload.len());
    dst.put_slice(&FRAME_MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one raw frame from a buffer.
///
/// Returns `Ok(None)` if the buffer does not yet hold a complete frame.
/// On success, consumes the frame bytes from the buffer and returns the
/// payload.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != FRAME_MAGIC {
        return Err(TransportError::BadMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    if payload_len > max_payload {
        return Err(TransportError::FrameTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < FRAME_HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(FRAME_HEADER_SIZE);
    Ok(Some(src.split_to(payload_len).freeze()))
}
