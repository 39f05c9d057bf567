use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, warn};

use stepmq_transport::{Context, RequestSocket};
use stepmq_wire::Message;

use crate::error::{QueueError, Result};
use crate::retry::{POLL_TIMEOUT, RECONNECT_DELAY};

enum Command {
    Publish(Message),
    Stop,
}

/// Client-role actor: owns an outbound FIFO queue and a request endpoint,
/// both confined to a dedicated worker thread.
///
/// [`publish`](Producer::publish) hands a message to the worker from any
/// thread and never reports delivery success or failure; the worker retries
/// the queue head through reconnects until its round trip is acknowledged.
/// Messages are sent strictly in publish order: the next head is attempted
/// only after the previous one has been acknowledged.
pub struct Producer {
    inbox: Sender<Command>,
    depth: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl Producer {
    /// Spawn the producer thread; an initial connect is scheduled
    /// immediately.
    pub fn spawn(context: Context, path: impl Into<PathBuf>) -> Result<Self> {
        let (inbox, commands) = mpsc::channel();
        let depth = Arc::new(AtomicUsize::new(0));
        let worker = ProducerWorker {
            context,
            path: path.into(),
            commands,
            socket: None,
            queue: VecDeque::new(),
            depth: depth.clone(),
        };
        let thread = thread::Builder::new()
            .name("stepmq-producer".into())
            .spawn(move || worker.run())
            .map_err(QueueError::Spawn)?;
        Ok(Self {
            inbox,
            depth,
            thread: Some(thread),
        })
    }

    /// Queue one message for delivery.
    ///
    /// Callable from any thread; relative order of publishes from one
    /// thread is preserved. Infallible by contract: after the producer has
    /// shut down the message is dropped with a warning, which can only
    /// happen to publishes racing the drop of this handle.
    pub fn publish(&self, message: Message) {
        self.depth.fetch_add(1, Ordering::SeqCst);
        if let Err(rejected) = self.inbox.send(Command::Publish(message)) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            if let Command::Publish(message) = rejected.0 {
                warn!(id = message.id, "publish after shutdown; message dropped");
            }
        }
    }

    /// Number of messages accepted but not yet acknowledged by the peer.
    ///
    /// Diagnostic gauge: non-decreasing while no connection is established,
    /// decremented only when a round trip fully succeeds.
    pub fn pending(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        // The stop sentinel invalidates all commands queued behind it.
        let _ = self.inbox.send(Command::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct ProducerWorker {
    context: Context,
    path: PathBuf,
    commands: Receiver<Command>,
    socket: Option<RequestSocket>,
    queue: VecDeque<Message>,
    depth: Arc<AtomicUsize>,
}

impl ProducerWorker {
    fn run(mut self) {
        // Initial connect is due immediately; `Some` here always means
        // "disconnected, next attempt at this instant".
        let mut next_connect = Some(Instant::now());

        loop {
            if let Some(due) = next_connect {
                if Instant::now() >= due {
                    next_connect = self.reconnect();
                }
            }

            let command = if let Some(due) = next_connect {
                match self
                    .commands
                    .recv_timeout(due.saturating_duration_since(Instant::now()))
                {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                // Connected and idle: block until the next command; a stop
                // or a publish is the only thing that can happen.
                match self.commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                }
            };

            match command {
                Some(Command::Publish(message)) => {
                    debug!(id = message.id, depth = self.queue.len() + 1, "message queued");
                    self.queue.push_back(message);
                    if self.socket.is_some() {
                        next_connect = self.drain();
                    }
                }
                Some(Command::Stop) => break,
                None => {} // reconnect tick
            }
        }

        self.socket = None;
        debug!("producer stopped");
    }

    /// Tear down any existing connection and connect afresh; on success,
    /// drain immediately. Returns the next reconnect deadline, or `None`
    /// once connected with the queue drained as far as it will go.
    fn reconnect(&mut self) -> Option<Instant> {
        self.socket = None;
        match self.context.connect_request(&self.path) {
            Ok(socket) => {
                debug!(path = ?self.path, "producer connected");
                self.socket = Some(socket);
                self.drain()
            }
            Err(err) => {
                warn!(path = ?self.path, error = %err, "producer connect failed; retrying");
                Some(Instant::now() + RECONNECT_DELAY)
            }
        }
    }

    /// Send-and-await-reply for the queue head until the queue is empty or
    /// a round trip fails. The head is popped only after its
    /// acknowledgment arrives; a mid-flight failure leaves it in place for
    /// retry on the next connection.
    fn drain(&mut self) -> Option<Instant> {
        let Some(mut socket) = self.socket.take() else {
            return Some(Instant::now() + RECONNECT_DELAY);
        };

        while let Some(head) = self.queue.front() {
            if let Err(err) = round_trip(&mut socket, head) {
                warn!(id = head.id, error = %err, "round trip failed; reconnecting");
                return Some(Instant::now() + RECONNECT_DELAY);
            }
            debug!(id = head.id, "message acknowledged by peer");
            self.queue.pop_front();
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }

        self.socket = Some(socket);
        None
    }
}

/// One full round trip: send the record, await the reply within the bounded
/// poll window, and require a positive acknowledgment.
fn round_trip(socket: &mut RequestSocket, message: &Message) -> Result<()> {
    socket.send(&message.encode())?;

    if !socket.poll_readable(POLL_TIMEOUT)? {
        return Err(QueueError::ReplyTimeout(POLL_TIMEOUT));
    }

    let reply = Message::decode(&socket.recv()?)?;
    if !reply.ack {
        // A well-formed non-acknowledgment counts as a failed round trip.
        return Err(QueueError::Refused { id: reply.id });
    }
    Ok(())
}
