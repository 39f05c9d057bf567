use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::context::ContextOptions;
use crate::error::{Result, TransportError};
use crate::framed::{FramedStream, Step};
use crate::sys;

/// Unix `sockaddr_un.sun_path` is 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// The bind-role endpoint of a lock-step request/reply pair.
///
/// Holds at most one accepted peer stream at a time; the transport style is
/// one producer conversing with one consumer. A new endpoint is created
/// wholesale on every rebuild, never repaired in place.
pub struct ReplySocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
    identity: Option<String>,
    peer: Option<FramedStream>,
    step: Step,
    max_payload: usize,
}

impl ReplySocket {
    pub(crate) fn bind(
        path: impl AsRef<Path>,
        identity: Option<&str>,
        options: &ContextOptions,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: MAX_PATH_LEN,
            });
        }

        remove_stale_socket(&path)?;

        let listener = UnixListener::bind(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(options.socket_mode))
            .map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;

        let created_inode = std::fs::symlink_metadata(&path)
            .map(|m| (m.dev(), m.ino()))
            .ok();

        info!(?path, identity, "reply endpoint bound");

        Ok(Self {
            listener,
            path,
            created_inode,
            identity: identity.map(str::to_owned),
            peer: None,
            step: Step::Recv,
            max_payload: options.max_payload_size,
        })
    }

    /// Wait up to `timeout` for an inbound request.
    ///
    /// With no peer connected this polls the listener and accepts a pending
    /// connection, reporting "nothing to read yet"; the next poll observes
    /// the peer's first frame. With a peer connected it polls the peer
    /// stream directly.
    pub fn poll_readable(&mut self, timeout: Duration) -> Result<bool> {
        match &self.peer {
            None => {
                if sys::wait_readable(self.listener.as_raw_fd(), timeout)? {
                    let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
                    debug!(path = ?self.path, "accepted peer connection");
                    self.peer = Some(FramedStream::new(stream, self.max_payload)?);
                    self.step = Step::Recv;
                }
                Ok(false)
            }
            Some(peer) => Ok(sys::wait_readable(peer.raw_fd(), timeout)?),
        }
    }

    /// Receive one request frame from the connected peer.
    pub fn recv(&mut self) -> Result<Bytes> {
        if self.step != Step::Recv {
            return Err(TransportError::InvalidState { expected: "send" });
        }
        let peer = self.peer.as_mut().ok_or(TransportError::NotConnected)?;
        let payload = peer.recv_frame()?;
        self.step = Step::Send;
        Ok(payload)
    }

    /// Send one reply frame to the connected peer.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if self.step != Step::Send {
            return Err(TransportError::InvalidState { expected: "recv" });
        }
        let peer = self.peer.as_mut().ok_or(TransportError::NotConnected)?;
        peer.send_frame(payload)?;
        self.step = Step::Recv;
        Ok(())
    }

    /// The identity attached to this endpoint, if any.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// The path this endpoint is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let metadata = std::fs::symlink_metadata(path).map_err(|e| TransportError::Bind {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.file_type().is_socket() {
        return Err(TransportError::Bind {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            ),
        });
    }
    debug!(?path, "removing stale socket");
    std::fs::remove_file(path).map_err(|e| TransportError::Bind {
        path: path.to_path_buf(),
        source: e,
    })
}

impl Drop for ReplySocket {
    fn drop(&mut self) {
        // Remove the socket file only if it is still the one we created;
        // a replaced path must survive our teardown.
        if let Some((expected_dev, expected_ino)) = self.created_inode {
            if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                if metadata.file_type().is_socket()
                    && metadata.dev() == expected_dev
                    && metadata.ino() == expected_ino
                {
                    debug!(path = ?self.path, "removing socket file");
                    let _ = std::fs::remove_file(&self.path);
                }
            }
        }
    }
}

impl std::fmt::Debug for ReplySocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplySocket")
            .field("path", &self.path)
            .field("identity", &self.identity)
            .field("connected", &self.peer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/stepmq-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("reply.sock")
    }

    fn cleanup(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn bind_poll_accept_roundtrip() {
        let path = make_sock_path("roundtrip");
        let ctx = Context::new();
        let mut server = ctx.bind_reply(&path, None).expect("bind should succeed");

        let client_path = path.clone();
        let client_ctx = ctx.clone();
        let client = std::thread::spawn(move || {
            let mut socket = client_ctx
                .connect_request(&client_path)
                .expect("connect should succeed");
            socket.send(b"request").expect("send should succeed");
            assert!(socket
                .poll_readable(Duration::from_secs(2))
                .expect("poll should succeed"));
            socket.recv().expect("recv should succeed")
        });

        // First readiness accepts the connection, a later one sees the frame.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !server.poll_readable(Duration::from_millis(50)).unwrap() {
            assert!(std::time::Instant::now() < deadline, "no request arrived");
        }
        let request = server.recv().unwrap();
        assert_eq!(request.as_ref(), b"request");
        server.send(b"reply").unwrap();

        let reply = client.join().unwrap();
        assert_eq!(reply.as_ref(), b"reply");
        cleanup(&path);
    }

    #[test]
    fn send_before_recv_is_rejected() {
        let path = make_sock_path("lockstep");
        let mut server = Context::new().bind_reply(&path, None).unwrap();
        assert!(matches!(
            server.send(b"unsolicited"),
            Err(TransportError::InvalidState { expected: "recv" })
        ));
        cleanup(&path);
    }

    #[test]
    fn recv_without_peer_is_rejected() {
        let path = make_sock_path("nopeer");
        let mut server = Context::new().bind_reply(&path, None).unwrap();
        assert!(matches!(server.recv(), Err(TransportError::NotConnected)));
        cleanup(&path);
    }

    #[test]
    fn poll_times_out_without_traffic() {
        let path = make_sock_path("idle");
        let mut server = Context::new().bind_reply(&path, None).unwrap();
        assert!(!server.poll_readable(Duration::from_millis(20)).unwrap());
        cleanup(&path);
    }

    #[test]
    fn identity_is_recorded() {
        let path = make_sock_path("identity");
        let server = Context::new().bind_reply(&path, Some("consumer-7")).unwrap();
        assert_eq!(server.identity(), Some("consumer-7"));
        cleanup(&path);
    }

    #[test]
    fn stale_socket_is_replaced() {
        let path = make_sock_path("stale");
        let first = Context::new().bind_reply(&path, None).unwrap();
        // Simulate a crashed predecessor: the file stays, the listener dies.
        std::mem::forget(first);
        let _second = Context::new()
            .bind_reply(&path, None)
            .expect("rebind over stale socket should succeed");
        cleanup(&path);
    }

    #[test]
    fn bind_refuses_non_socket_file() {
        let path = make_sock_path("regular");
        std::fs::write(&path, b"regular file").unwrap();
        assert!(matches!(
            Context::new().bind_reply(&path, None),
            Err(TransportError::Bind { .. })
        ));
        cleanup(&path);
    }

    #[test]
    fn bind_rejects_overlong_path() {
        let long = format!("/tmp/{}.sock", "a".repeat(200));
        assert!(matches!(
            Context::new().bind_reply(&long, None),
            Err(TransportError::PathTooLong { .. })
        ));
    }

    #[test]
    fn drop_removes_socket_file() {
        let path = make_sock_path("drop");
        let server = Context::new().bind_reply(&path, None).unwrap();
        assert!(path.exists());
        drop(server);
        assert!(!path.exists(), "socket file should be removed on drop");
        cleanup(&path);
    }

    #[test]
    fn drop_spares_replaced_path() {
        let path = make_sock_path("replaced");
        let server = Context::new().bind_reply(&path, None).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"replacement").unwrap();
        drop(server);
        assert!(path.exists(), "replaced path must survive drop");
        cleanup(&path);
    }

    #[test]
    fn socket_mode_is_applied() {
        let path = make_sock_path("mode");
        let _server = Context::new().bind_reply(&path, None).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        cleanup(&path);
    }
}
