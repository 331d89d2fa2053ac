//! Periodic refresh of power and audio state
//!
//! The poller owns a timer thread that enqueues a `PollPowerAndAudio`
//! command on every tick. It never talks to the device itself, so polling
//! traffic is serialized with user commands through the same queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::command::Command;
use crate::error::{Result, SessionError};
use crate::queue::CommandQueue;

struct Running {
    cancel: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

pub struct Poller {
    queue: CommandQueue,
    interval_ms: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl Poller {
    pub fn new(queue: CommandQueue) -> Self {
        Self {
            queue,
            interval_ms: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    /// Start polling every `interval`, the first refresh immediately
    ///
    /// When already running only the interval changes; it takes effect after
    /// the current wait.
    pub fn start(&self, interval: Duration) -> Result<()> {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        if interval_ms == 0 {
            return Err(SessionError::Config(
                "Poll interval must be at least 1ms".to_string(),
            ));
        }
        self.interval_ms.store(interval_ms, Ordering::SeqCst);

        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            if !current.thread.is_finished() {
                tracing::debug!("poller already running, interval now {}ms", interval_ms);
                return Ok(());
            }
        }

        let (cancel, cancelled) = mpsc::channel();
        let queue = self.queue.clone();
        let interval = self.interval_ms.clone();
        let thread = thread::Builder::new()
            .name("smartip-poller".to_string())
            .spawn(move || run(queue, interval, cancelled))
            .map_err(|e| SessionError::Spawn("poller", e))?;

        tracing::info!("Polling started every {}ms", interval_ms);
        *running = Some(Running { cancel, thread });
        Ok(())
    }

    /// Stop rescheduling; refreshes already queued still run
    pub fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };

        let _ = running.cancel.send(());
        if running.thread.join().is_err() {
            tracing::error!("poller thread panicked");
        }
        tracing::info!("Polling stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.thread.is_finished())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(queue: CommandQueue, interval_ms: Arc<AtomicU64>, cancelled: mpsc::Receiver<()>) {
    loop {
        if let Err(e) = queue.try_enqueue(Command::PollPowerAndAudio) {
            if queue.is_closed() {
                tracing::debug!("queue closed, poller exiting");
                return;
            }
            tracing::warn!("skipping poll: {}", e);
        }

        let wait = Duration::from_millis(interval_ms.load(Ordering::SeqCst));
        match cancelled.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
