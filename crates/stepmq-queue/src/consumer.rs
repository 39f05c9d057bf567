use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use stepmq_transport::{Context, ReplySocket};
use stepmq_wire::Message;

use crate::error::{QueueError, Result};
use crate::retry::{StopFlag, POLL_TIMEOUT, RECONNECT_DELAY};

/// Capability invoked with each successfully acknowledged request.
///
/// Called on the consumer's own thread, once per request, with an owned
/// fully-decoded record; the consumer never touches the record again after
/// handoff. The acknowledgment has already been sent when this runs, so a
/// slow observer delays nothing on the wire, only subsequent dispatches.
pub trait MessageObserver: Send + 'static {
    fn on_message(&self, message: Message);
}

impl<F> MessageObserver for F
where
    F: Fn(Message) + Send + 'static,
{
    fn on_message(&self, message: Message) {
        self(message)
    }
}

/// Server-role actor: binds a reply endpoint and dispatches inbound
/// messages to an observer.
///
/// The worker thread starts at construction and runs until the `Consumer`
/// is dropped. Every socket fault (bind failure, poll error, receive
/// error, malformed payload, reply-send failure) tears the endpoint down
/// and rebuilds it after [`RECONNECT_DELAY`]; none are fatal to the
/// process and none reach the observer.
pub struct Consumer {
    stop: StopFlag,
    thread: Option<JoinHandle<()>>,
}

impl Consumer {
    /// Spawn the consumer thread and start serving `path`.
    pub fn spawn<O: MessageObserver>(
        observer: O,
        context: Context,
        path: impl Into<PathBuf>,
        identity: Option<String>,
    ) -> Result<Self> {
        let stop = StopFlag::new();
        let worker = ConsumerWorker {
            observer,
            context,
            path: path.into(),
            identity,
            stop: stop.clone(),
        };
        let thread = thread::Builder::new()
            .name("stepmq-consumer".into())
            .spawn(move || worker.run())
            .map_err(QueueError::Spawn)?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.stop.request_stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct ConsumerWorker<O> {
    observer: O,
    context: Context,
    path: PathBuf,
    identity: Option<String>,
    stop: StopFlag,
}

impl<O: MessageObserver> ConsumerWorker<O> {
    fn run(self) {
        while !self.stop.should_stop() {
            let mut socket = match self
                .context
                .bind_reply(&self.path, self.identity.as_deref())
            {
                Ok(socket) => socket,
                Err(err) => {
                    warn!(path = ?self.path, error = %err, "consumer bind failed; retrying");
                    thread::sleep(RECONNECT_DELAY);
                    continue;
                }
            };

            if let Err(err) = self.serve(&mut socket) {
                warn!(error = %err, "consumer connection fault; rebuilding endpoint");
                drop(socket);
                thread::sleep(RECONNECT_DELAY);
            }
        }
        debug!("consumer stopped");
    }

    /// Inner loop: poll → receive → acknowledge → dispatch, until a stop is
    /// requested or the connection faults.
    fn serve(&self, socket: &mut ReplySocket) -> Result<()> {
        while !self.stop.should_stop() {
            if !socket.poll_readable(POLL_TIMEOUT)? {
                // Idle tick; also where a stop request is noticed.
                continue;
            }

            let frame = socket.recv()?;
            let message = Message::decode(&frame)?;

            // Acknowledge before dispatching: the transport is lock-step, so
            // the reply must go out before the next request can arrive, and
            // it must not wait on observer latency. The client learns
            // "received", not "fully processed".
            socket.send(&message.ack_reply().encode())?;
            debug!(id = message.id, kind = %message.kind, "message acknowledged");

            self.observer.on_message(message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/stepmq-consumer-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("consumer.sock")
    }

    #[test]
    fn drop_joins_worker_promptly() {
        let path = make_sock_path("drop");
        let consumer = Consumer::spawn(|_m: Message| {}, Context::new(), &path, None).unwrap();

        let started = Instant::now();
        drop(consumer);
        // Bounded by one poll tick plus one rebuild delay, with margin.
        assert!(started.elapsed() < Duration::from_secs(2));

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn acknowledges_and_dispatches_one_request() {
        let path = make_sock_path("ack");
        let dispatched = Arc::new(AtomicUsize::new(0));
        let seen = dispatched.clone();
        let _consumer = Consumer::spawn(
            move |_m: Message| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
            Context::new(),
            &path,
            None,
        )
        .unwrap();

        // Drive one round trip by hand on the request side.
        let ctx = Context::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut socket = loop {
            match ctx.connect_request(&path) {
                Ok(socket) => break socket,
                Err(_) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(20));
                }
                Err(err) => panic!("consumer never bound: {err}"),
            }
        };

        let request = Message::new(9, stepmq_wire::MessageKind::Message, &b"unit"[..]);
        socket.send(&request.encode()).unwrap();
        assert!(socket.poll_readable(Duration::from_secs(2)).unwrap());
        let reply = Message::decode(&socket.recv().unwrap()).unwrap();
        assert_eq!(reply.id, 9);
        assert!(reply.ack);

        let deadline = Instant::now() + Duration::from_secs(2);
        while dispatched.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "observer never ran");
            thread::sleep(Duration::from_millis(10));
        }

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
