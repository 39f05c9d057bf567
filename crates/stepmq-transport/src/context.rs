use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::reply::ReplySocket;
use crate::request::RequestSocket;

/// Default maximum frame payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Transport-wide options carried by a [`Context`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Maximum frame payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Permission mode for created socket paths. Default: `0o600`.
    pub socket_mode: u32,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            socket_mode: 0o600,
        }
    }
}

/// Shared handle to the messaging environment.
///
/// A `Context` is cheap to clone and safe to share: every endpoint created
/// from it carries the same transport-wide options. The underlying state
/// lives as long as the longest holder; actors keep a clone for their whole
/// lifetime.
#[derive(Clone, Debug, Default)]
pub struct Context {
    inner: Arc<ContextOptions>,
}

impl Context {
    /// Create a context with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with explicit options.
    pub fn with_options(options: ContextOptions) -> Self {
        Self {
            inner: Arc::new(options),
        }
    }

    /// The options endpoints created from this context will use.
    pub fn options(&self) -> &ContextOptions {
        &self.inner
    }

    /// Create and bind a reply-capable endpoint (server role).
    ///
    /// The optional identity is a stable diagnostic token attached to the
    /// endpoint; it is logged on bind and surfaced via
    /// [`ReplySocket::identity`].
    pub fn bind_reply(&self, path: impl AsRef<Path>, identity: Option<&str>) -> Result<ReplySocket> {
        ReplySocket::bind(path, identity, self.options())
    }

    /// Create and connect a request-capable endpoint (client role).
    pub fn connect_request(&self, path: impl AsRef<Path>) -> Result<RequestSocket> {
        RequestSocket::connect(path, self.options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_options() {
        let ctx = Context::with_options(ContextOptions {
            max_payload_size: 1024,
            ..ContextOptions::default()
        });
        let other = ctx.clone();
        assert_eq!(other.options().max_payload_size, 1024);
        assert_eq!(other.options().socket_mode, 0o600);
    }

    #[test]
    fn default_options() {
        let ctx = Context::new();
        assert_eq!(ctx.options().max_payload_size, DEFAULT_MAX_PAYLOAD);
    }
}
