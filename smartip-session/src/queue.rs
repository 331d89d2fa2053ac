//! Bounded FIFO command queue with a single worker thread
//!
//! Producers on any thread call [`CommandQueue::enqueue`], which never
//! blocks: a full or closed queue rejects the command. One worker thread
//! drains the queue in order, pausing for the configured cooldown after each
//! command so the device is never flooded. [`CommandQueue::close`] rejects
//! further commands and places a stop marker behind everything already
//! queued, so the worker finishes the backlog before it exits.
//!
//! The closed flag, the capacity reservation and the send happen under one
//! lock, so a command is either accepted ahead of the stop marker or
//! rejected. Nothing lands behind it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::command::Command;
use crate::error::{Result, SessionError};

/// Executes commands taken off the queue
pub trait CommandHandler: Send + 'static {
    fn handle(&mut self, command: Command);
}

enum QueueItem {
    Run(Command),
    Stop,
}

/// Producer handle; clones share the same queue
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::SyncSender<QueueItem>,
    // Guards the send path; `true` once the stop marker is queued
    closed: Arc<Mutex<bool>>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

/// Consumer side, moved into the worker
pub struct QueueReceiver {
    rx: mpsc::Receiver<QueueItem>,
    pending: Arc<AtomicUsize>,
}

impl QueueReceiver {
    fn recv(&self) -> Option<Command> {
        match self.rx.recv() {
            Ok(QueueItem::Run(command)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Some(command)
            }
            Ok(QueueItem::Stop) | Err(_) => None,
        }
    }
}

impl CommandQueue {
    /// Create a queue holding at most `capacity` pending commands
    pub fn bounded(capacity: usize) -> (Self, QueueReceiver) {
        // One slot beyond the command limit is reserved for the stop marker
        let (tx, rx) = mpsc::sync_channel(capacity + 1);
        let pending = Arc::new(AtomicUsize::new(0));
        let queue = Self {
            tx,
            closed: Arc::new(Mutex::new(false)),
            pending: pending.clone(),
            capacity,
        };
        (queue, QueueReceiver { rx, pending })
    }

    /// Offer a command without blocking, returning whether it was accepted
    pub fn enqueue(&self, command: Command) -> bool {
        self.try_enqueue(command).is_ok()
    }

    /// Offer a command without blocking, reporting why it was rejected
    pub fn try_enqueue(&self, command: Command) -> Result<()> {
        let name = command.name();
        let closed = self.closed.lock();
        if *closed {
            tracing::debug!("rejecting {}: queue closed", name);
            return Err(SessionError::Closed);
        }

        let reserved = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                (pending < self.capacity).then_some(pending + 1)
            });
        if reserved.is_err() {
            tracing::warn!("rejecting {}: queue full ({} pending)", name, self.capacity);
            return Err(SessionError::QueueFull);
        }

        match self.tx.try_send(QueueItem::Run(command)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                tracing::debug!("rejecting {}: worker gone", name);
                Err(SessionError::Closed)
            }
        }
    }

    /// Stop accepting commands and let the worker exit after the backlog
    ///
    /// Returns `false` if the queue was already closed.
    pub fn close(&self) -> bool {
        let mut closed = self.closed.lock();
        if *closed {
            return false;
        }
        *closed = true;

        // At most `capacity` commands sit in the channel, so the reserved
        // slot is always free
        if let Err(TrySendError::Full(_)) = self.tx.try_send(QueueItem::Stop) {
            tracing::error!("no room for the stop marker");
        }
        tracing::debug!("command queue closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Commands accepted but not yet taken by the worker
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the worker that drains `receiver` into `handler`
pub fn spawn_worker<H: CommandHandler>(
    receiver: QueueReceiver,
    mut handler: H,
    cooldown: Duration,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("smartip-worker".to_string())
        .spawn(move || {
            tracing::info!("Session worker started");

            while let Some(command) = receiver.recv() {
                let name = command.name();
                tracing::trace!("executing {}", name);

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(command)));
                if let Err(payload) = outcome {
                    tracing::error!("{} panicked: {}", name, panic_message(&*payload));
                }

                if !cooldown.is_zero() {
                    thread::sleep(cooldown);
                }
            }

            tracing::info!("Session worker stopped");
        })
        .map_err(|e| SessionError::Spawn("worker", e))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
