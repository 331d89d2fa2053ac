//! Last-known device state with change detection
//!
//! The worker thread is the only writer. Every write goes through
//! [`StateModel::update`], which compares against the stored value with plain
//! `PartialEq` (raw IEEE comparison for reals) and reports whether anything
//! changed. Readers on other threads take a [`DeviceSnapshot`] clone.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use smartip_api::volume::db_to_percent;
use smartip_api::{DeviceInfo, PowerState};

/// A consistent copy of everything known about the device
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DeviceSnapshot {
    /// Whether the last request reached the device
    pub responding: bool,

    /// Level in dB, `None` until first observed or set
    pub level_db: Option<f64>,

    pub mute: bool,

    pub power_state: PowerState,

    /// Power allocated by the PoE switch, in watts
    pub allocated_power: f64,

    /// True when the device limits itself to 15W
    pub poe_15w: bool,

    /// Identity from the last successful info poll
    pub device_info: Option<DeviceInfo>,
}

impl DeviceSnapshot {
    /// Level as a fraction of the device range, derived from `level_db`
    pub fn level_percent(&self) -> Option<f64> {
        self.level_db.map(db_to_percent)
    }
}

/// A single observable field of [`DeviceSnapshot`]
///
/// # Example
///
/// ```rust,ignore
/// if state.update::<Mute>(true) {
///     events.emit(DeviceEvent::Mute(true));
/// }
/// ```
pub trait Property {
    /// Value type stored for this property
    type Value: Clone + PartialEq + fmt::Debug;

    /// Unique key used in logs
    const KEY: &'static str;

    fn get(state: &DeviceSnapshot) -> Self::Value;

    fn set(state: &mut DeviceSnapshot, value: Self::Value);
}

macro_rules! define_property {
    ($(#[$meta:meta])* $name:ident, $key:literal, $field:ident: $ty:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Property for $name {
            type Value = $ty;
            const KEY: &'static str = $key;

            fn get(state: &DeviceSnapshot) -> Self::Value {
                state.$field.clone()
            }

            fn set(state: &mut DeviceSnapshot, value: Self::Value) {
                state.$field = value;
            }
        }
    };
}

define_property!(
    /// Reachability of the device
    Responding, "responding", responding: bool
);
define_property!(
    /// Volume level in dB
    LevelDb, "level_db", level_db: Option<f64>
);
define_property!(Mute, "mute", mute: bool);
define_property!(Power, "power_state", power_state: PowerState);
define_property!(
    /// PoE allocation in watts
    AllocatedPower, "allocated_power", allocated_power: f64
);
define_property!(Poe15W, "poe_15w", poe_15w: bool);

/// Shared handle to the device state
///
/// Cloning shares the same underlying state. Only the session worker holds a
/// handle it writes through; every other holder reads snapshots.
#[derive(Clone, Default)]
pub struct StateModel {
    inner: Arc<RwLock<DeviceSnapshot>>,
}

impl StateModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.inner.read().clone()
    }

    /// Read a single property
    pub fn get<P: Property>(&self) -> P::Value {
        P::get(&self.inner.read())
    }

    /// Store a value, returning whether it differed from the stored one
    pub(crate) fn update<P: Property>(&self, value: P::Value) -> bool {
        let mut state = self.inner.write();
        if P::get(&state) == value {
            return false;
        }

        tracing::trace!("{} changed to {:?}", P::KEY, value);
        P::set(&mut state, value);
        true
    }

    /// Swap in a new identity record as a whole
    pub(crate) fn replace_device_info(&self, info: DeviceInfo) {
        self.inner.write().device_info = Some(info);
    }
}

impl fmt::Debug for StateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateModel")
            .field("state", &*self.inner.read())
            .finish()
    }
}
