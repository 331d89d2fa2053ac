//! Change events and their fan-out to subscribers
//!
//! Every observable property change produces exactly one [`DeviceEvent`].
//! The [`EventBus`] keeps one channel per subscriber and prunes channels
//! whose receiving side has been dropped.

use std::sync::mpsc;

use parking_lot::Mutex;
use smartip_api::{DeviceInfo, PowerState};

use crate::iter::EventIterator;

/// A change observed on the device, or an action it confirmed
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Reachability flipped
    Responding(bool),

    /// Volume level in dB
    LevelDb(f64),

    /// Volume level as a fraction of the device range
    LevelPercent(f64),

    Mute(bool),

    /// New identity payload
    DeviceInfo(DeviceInfo),

    PowerState(PowerState),

    Poe15W(bool),

    /// PoE allocation in watts
    AllocatedPower(f64),

    /// A profile restore was accepted by the device
    ProfileRestored(u32),
}

impl DeviceEvent {
    /// Stable key identifying the kind of event
    pub fn key(&self) -> &'static str {
        match self {
            DeviceEvent::Responding(_) => "responding",
            DeviceEvent::LevelDb(_) => "level_db",
            DeviceEvent::LevelPercent(_) => "level_percent",
            DeviceEvent::Mute(_) => "mute",
            DeviceEvent::DeviceInfo(_) => "device_info",
            DeviceEvent::PowerState(_) => "power_state",
            DeviceEvent::Poe15W(_) => "poe_15w",
            DeviceEvent::AllocatedPower(_) => "allocated_power",
            DeviceEvent::ProfileRestored(_) => "profile_restored",
        }
    }
}

/// Fan-out of events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::Sender<DeviceEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    ///
    /// The subscriber sees every event emitted after this call.
    pub fn subscribe(&self) -> EventIterator {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        EventIterator::new(rx)
    }

    /// Deliver an event to every live subscriber
    pub fn emit(&self, event: DeviceEvent) {
        let mut subscribers = self.subscribers.lock();
        tracing::debug!("emitting {} to {} subscriber(s)", event.key(), subscribers.len());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
