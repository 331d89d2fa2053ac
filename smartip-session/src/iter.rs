//! Per-subscriber event stream
//!
//! Every [`SessionEngine::subscribe`](crate::SessionEngine::subscribe) call
//! gets its own channel. Iterating an [`EventIterator`] blocks until the
//! session is dropped; the `try_*` and timeout variants never wait forever.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::event::DeviceEvent;

/// Events from one subscription
///
/// A slow consumer only backs up its own channel, never the worker or
/// other subscribers.
///
/// # Example
///
/// ```rust,ignore
/// let events = session.subscribe();
/// session.set_mute(true);
///
/// let muted = events.wait_for(|e| *e == DeviceEvent::Mute(true), Duration::from_secs(2));
/// for event in events.try_iter() {
///     println!("{}: {:?}", event.key(), event);
/// }
/// ```
pub struct EventIterator {
    rx: mpsc::Receiver<DeviceEvent>,
}

impl EventIterator {
    pub(crate) fn new(rx: mpsc::Receiver<DeviceEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the session is gone
    pub fn recv(&self) -> Option<DeviceEvent> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<DeviceEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<DeviceEvent> {
        self.rx.try_recv().ok()
    }

    /// Events already delivered, without blocking
    pub fn try_iter(&self) -> mpsc::TryIter<'_, DeviceEvent> {
        self.rx.try_iter()
    }

    /// Events arriving no more than `gap` apart; ends at the first longer
    /// silence
    pub fn timeout_iter(&self, gap: Duration) -> impl Iterator<Item = DeviceEvent> + '_ {
        std::iter::from_fn(move || self.recv_timeout(gap))
    }

    /// Skip events until one matches `accept`, giving up after `timeout`
    ///
    /// Skipped events are consumed.
    pub fn wait_for(
        &self,
        mut accept: impl FnMut(&DeviceEvent) -> bool,
        timeout: Duration,
    ) -> Option<DeviceEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.recv_timeout(remaining)?;
            if accept(&event) {
                return Some(event);
            }
        }
    }
}

impl Iterator for EventIterator {
    type Item = DeviceEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}
