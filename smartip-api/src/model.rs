//! Wire models for the Smart IP REST resources

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ApiError;

// ============================================================================
// PowerState
// ============================================================================

/// Power state of the loudspeaker
///
/// `Unknown` and `Sleep` are only ever reported by the device. `Boot` is only
/// ever requested: it reboots the device, which then reports another state
/// on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerState {
    #[default]
    Unknown,
    Standby,
    Sleep,
    Active,
    Boot,
}

impl PowerState {
    /// Map a device-reported string; anything unrecognised is `Unknown`
    pub fn from_wire(value: &str) -> Self {
        match value {
            "STANDBY" => PowerState::Standby,
            "SLEEP" => PowerState::Sleep,
            "ACTIVE" => PowerState::Active,
            "BOOT" => PowerState::Boot,
            _ => PowerState::Unknown,
        }
    }

    /// The upper-case name used in request bodies
    pub fn as_wire(&self) -> &'static str {
        match self {
            PowerState::Unknown => "UNKNOWN",
            PowerState::Standby => "STANDBY",
            PowerState::Sleep => "SLEEP",
            PowerState::Active => "ACTIVE",
            PowerState::Boot => "BOOT",
        }
    }

    /// Whether a caller may request this state
    pub fn is_requestable(&self) -> bool {
        matches!(self, PowerState::Standby | PowerState::Active | PowerState::Boot)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PowerState::Unknown => "Unknown",
            PowerState::Standby => "Standby",
            PowerState::Sleep => "Sleep",
            PowerState::Active => "Active",
            PowerState::Boot => "Boot",
        };
        f.write_str(name)
    }
}

impl FromStr for PowerState {
    type Err = ApiError;

    /// Case-insensitive parse of a state name, strict unlike [`PowerState::from_wire`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(PowerState::Unknown),
            "STANDBY" => Ok(PowerState::Standby),
            "SLEEP" => Ok(PowerState::Sleep),
            "ACTIVE" => Ok(PowerState::Active),
            "BOOT" => Ok(PowerState::Boot),
            _ => Err(ApiError::InvalidParameter(format!("unknown power state '{}'", s))),
        }
    }
}

impl Serialize for PowerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for PowerState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(PowerState::from_wire(&value))
    }
}

// ============================================================================
// Response bodies
// ============================================================================

/// Identity of the device, as returned by `GET device/info`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    /// Firmware identification, e.g. `44x0-1.1.11-202007021238`
    #[serde(rename = "fwId")]
    pub firmware_id: String,

    /// Source revision the firmware was built from, e.g. `c5ca14`
    pub build: String,

    /// Platform software version, e.g. `1.0.0`
    #[serde(rename = "baseId")]
    pub base_id: String,

    #[serde(rename = "hwId")]
    pub hardware_id: String,

    /// Compatibility number for firmware upgrades
    #[serde(rename = "upgradeId")]
    pub upgrade_id: i64,

    /// Model name, e.g. `4430`
    pub model: String,

    /// e.g. `SAM_2WAY`
    pub category: String,

    /// e.g. `SAM_IP`
    pub technology: String,

    #[serde(rename = "apiVer")]
    pub api_version: String,

    /// New firmware is running and waits for confirmation; the bootloader
    /// reverts it on the next reboot otherwise.
    #[serde(rename = "confirmFwUpdate")]
    pub confirm_firmware_update: bool,
}

/// Volume and mute, as returned by `GET public/v1/audio/volume`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioVolume {
    /// Level in dB
    #[serde(rename = "level")]
    pub level_db: f64,
    pub mute: bool,
}

/// Power and PoE budget, as returned by `GET public/v1/device/pwr`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePower {
    pub state: PowerState,

    /// Power allocated by the PoE switch, in watts
    #[serde(rename = "poeAllocatedPwr")]
    pub allocated_power: f64,

    /// True when the device limits itself to 15W, false when it needs 30W
    #[serde(rename = "poePd15W")]
    pub poe_15w: bool,
}

impl DevicePower {
    /// Allocated power as tenths of a watt, the fixed-point form used by
    /// control panels
    pub fn allocated_power_deciwatts(&self) -> u16 {
        deciwatts(self.allocated_power)
    }
}

/// Convert watts into tenths of a watt, saturating at the `u16` range
pub fn deciwatts(watts: f64) -> u16 {
    (watts * 10.0).round().clamp(0.0, f64::from(u16::MAX)) as u16
}
