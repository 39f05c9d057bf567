use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::codec::{decode_frame, encode_frame};
use crate::error::{Result, TransportError};
use crate::sys;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Which half of the request/reply alternation an endpoint must perform
/// next. Both socket roles track this to enforce lock-step usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Recv,
    Send,
}

/// Guard timeout on raw stream reads and writes. Readiness is established by
/// polling before every receive, so this only fires when a peer stalls
/// mid-frame; it bounds how long a half-written frame can hold the calling
/// thread.
const IO_GUARD_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected stream carrying length-prefixed frames.
///
/// Handles partial reads and short writes internally; callers always see
/// complete frames.
pub(crate) struct FramedStream {
    stream: UnixStream,
    buf: BytesMut,
    max_payload: usize,
}

impl FramedStream {
    /// Wrap a connected stream: linger disabled, guard timeouts applied.
    pub(crate) fn new(stream: UnixStream, max_payload: usize) -> Result<Self> {
        sys::set_linger_off(stream.as_raw_fd())?;
        stream.set_read_timeout(Some(IO_GUARD_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_GUARD_TIMEOUT))?;
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            max_payload,
        })
    }

    /// Read the next complete frame, blocking until it arrives.
    ///
    /// Returns [`TransportError::ConnectionClosed`] on EOF, including EOF in
    /// the middle of a frame.
    pub(crate) fn recv_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(payload) = decode_frame(&mut self.buf, self.max_payload)? {
                return Ok(payload);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            };
            if read == 0 {
                return Err(TransportError::ConnectionClosed);
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Encode and write one frame, blocking until fully written.
    pub(crate) fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        let mut wire = BytesMut::with_capacity(payload.len() + crate::codec::FRAME_HEADER_SIZE);
        encode_frame(payload, self.max_payload, &mut wire)?;

        let mut offset = 0usize;
        while offset < wire.len() {
            match self.stream.write(&wire[offset..]) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        match self.stream.flush() {
            Ok(()) => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    pub(crate) fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

impl std::fmt::Debug for FramedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedStream")
            .field("buffered", &self.buf.len())
            .field("max_payload", &self.max_payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 16 * 1024 * 1024;

    fn pair() -> (FramedStream, FramedStream) {
        let (left, right) = UnixStream::pair().unwrap();
        (
            FramedStream::new(left, MAX).unwrap(),
            FramedStream::new(right, MAX).unwrap(),
        )
    }

    #[test]
    fn frame_roundtrip_over_socket_pair() {
        let (mut left, mut right) = pair();
        left.send_frame(b"ping").unwrap();
        let payload = right.recv_frame().unwrap();
        assert_eq!(payload.as_ref(), b"ping");
    }

    #[test]
    fn recv_reports_closed_on_eof() {
        let (left, mut right) = pair();
        drop(left);
        assert!(matches!(
            right.recv_frame(),
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[test]
    fn recv_reports_closed_mid_frame() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut writer = left;
        // Header promising 16 bytes, then only part of the payload.
        let mut wire = BytesMut::new();
        encode_frame(&[0xAB; 16], MAX, &mut wire).unwrap();
        writer.write_all(&wire[..wire.len() - 7]).unwrap();
        drop(writer);

        let mut framed = FramedStream::new(right, MAX).unwrap();
        assert!(matches!(
            framed.recv_frame(),
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[test]
    fn consecutive_frames_keep_boundaries() {
        let (mut left, mut right) = pair();
        left.send_frame(b"one").unwrap();
        left.send_frame(b"two").unwrap();
        assert_eq!(right.recv_frame().unwrap().as_ref(), b"one");
        assert_eq!(right.recv_frame().unwrap().as_ref(), b"two");
    }

    #[test]
    fn large_frame_roundtrip() {
        let (mut left, mut right) = pair();
        let payload = vec![0x5A; 256 * 1024];
        let sender = std::thread::spawn(move || {
            left.send_frame(&payload).unwrap();
            payload
        });
        let received = right.recv_frame().unwrap();
        let sent = sender.join().unwrap();
        assert_eq!(received.as_ref(), sent.as_slice());
    }
}
