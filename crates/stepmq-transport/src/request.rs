use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::context::ContextOptions;
use crate::error::{Result, TransportError};
use crate::framed::{FramedStream, Step};
use crate::sys;

/// The connect-role endpoint of a lock-step request/reply pair.
///
/// Usage alternates strictly: one [`send`](RequestSocket::send), then one
/// [`recv`](RequestSocket::recv). A failed round trip leaves the endpoint
/// unusable for that conversation; callers discard it and connect a fresh
/// one rather than resynchronizing.
pub struct RequestSocket {
    peer: FramedStream,
    path: PathBuf,
    step: Step,
}

impl RequestSocket {
    pub(crate) fn connect(path: impl AsRef<Path>, options: &ContextOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = UnixStream::connect(&path).map_err(|e| TransportError::Connect {
            path: path.clone(),
            source: e,
        })?;
        debug!(?path, "request endpoint connected");
        Ok(Self {
            peer: FramedStream::new(stream, options.max_payload_size)?,
            path,
            step: Step::Send,
        })
    }

    /// Send one request frame.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if self.step != Step::Send {
            return Err(TransportError::InvalidState { expected: "recv" });
        }
        self.peer.send_frame(payload)?;
        self.step = Step::Recv;
        Ok(())
    }

    /// Wait up to `timeout` for the reply to the last request.
    pub fn poll_readable(&mut self, timeout: Duration) -> Result<bool> {
        Ok(sys::wait_readable(self.peer.raw_fd(), timeout)?)
    }

    /// Receive the reply frame to the last request.
    pub fn recv(&mut self) -> Result<Bytes> {
        if self.step != Step::Recv {
            return Err(TransportError::InvalidState { expected: "send" });
        }
        let payload = self.peer.recv_frame()?;
        self.step = Step::Send;
        Ok(payload)
    }

    /// The path this endpoint is connected to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RequestSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSocket")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/stepmq-req-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("request.sock")
    }

    #[test]
    fn connect_fails_without_listener() {
        let path = make_sock_path("orphan");
        assert!(matches!(
            Context::new().connect_request(&path),
            Err(TransportError::Connect { .. })
        ));
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn recv_before_send_is_rejected() {
        let path = make_sock_path("lockstep");
        let _server = Context::new().bind_reply(&path, None).unwrap();
        let mut client = Context::new().connect_request(&path).unwrap();
        assert!(matches!(
            client.recv(),
            Err(TransportError::InvalidState { expected: "send" })
        ));
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn double_send_is_rejected() {
        let path = make_sock_path("double");
        let _server = Context::new().bind_reply(&path, None).unwrap();
        let mut client = Context::new().connect_request(&path).unwrap();
        client.send(b"first").unwrap();
        assert!(matches!(
            client.send(b"second"),
            Err(TransportError::InvalidState { expected: "recv" })
        ));
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn reply_poll_times_out_when_server_is_silent() {
        let path = make_sock_path("silent");
        let mut server = Context::new().bind_reply(&path, None).unwrap();
        let mut client = Context::new().connect_request(&path).unwrap();
        client.send(b"request").unwrap();
        // Server accepts but never replies.
        let _ = server.poll_readable(Duration::from_millis(100));
        assert!(!client.poll_readable(Duration::from_millis(50)).unwrap());
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
