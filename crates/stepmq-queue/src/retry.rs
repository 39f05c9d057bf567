//! Shared recovery policy: the protocol's two timing constants and the
//! cooperative stop token both actors use.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fixed delay between endpoint rebuild attempts. Retries are unbounded and
/// the spacing never grows; a reachable peer is reacquired within one delay
/// of becoming available.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Bounded readiness poll used by both actors. For the consumer this is the
/// liveness tick on which a stop request is noticed; for the producer it is
/// the window one reply may take before the round trip counts as failed.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Cooperative cancellation token shared between an actor thread and its
/// controlling handle.
///
/// The actor checks the flag once per loop iteration, so observing a stop
/// request is bounded by [`POLL_TIMEOUT`] plus any in-progress
/// [`RECONNECT_DELAY`]. There is no hard cancellation of an in-flight poll.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the owning actor to stop at its next iteration boundary.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn should_stop(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
