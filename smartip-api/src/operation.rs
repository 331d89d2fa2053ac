//! Typed REST operations
//!
//! Every Smart IP resource is a fixed path with a JSON body. Reads are GETs
//! whose body deserializes into a response model; writes are PUTs whose
//! request model serializes into the body and whose only outcome is the
//! status code.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{AudioVolume, DeviceInfo, DevicePower, PowerState};
use crate::volume::{clamp_db, round_db};
use crate::{ApiError, Result};

/// Path of the device identity resource
pub const DEVICE_INFO_PATH: &str = "device/info";
/// Path of the volume and mute resource
pub const AUDIO_VOLUME_PATH: &str = "public/v1/audio/volume";
/// Path of the power state and PoE resource
pub const DEVICE_POWER_PATH: &str = "public/v1/device/pwr";
/// Path of the profile restore action
pub const PROFILE_RESTORE_PATH: &str = "public/v1/profile/restore";

/// A GET operation against a fixed resource
pub trait ReadOperation {
    /// The parsed response body
    type Response: DeserializeOwned;

    /// Resource path relative to the device base URL
    const PATH: &'static str;

    /// Parse the response body into the typed response
    fn parse_response(body: &str) -> Result<Self::Response> {
        serde_json::from_str(body).map_err(|e| ApiError::ParseError(format!("{}: {}", Self::PATH, e)))
    }
}

/// A PUT operation against a fixed resource
pub trait WriteOperation {
    /// The request body model
    type Request: Serialize;

    /// Resource path relative to the device base URL
    const PATH: &'static str;

    /// Serialize the request into the JSON body
    fn build_body(request: &Self::Request) -> Result<String> {
        Ok(serde_json::to_string(request)?)
    }
}

// ============================================================================
// Reads
// ============================================================================

/// `GET device/info`
pub struct GetDeviceInfoOperation;

impl ReadOperation for GetDeviceInfoOperation {
    type Response = DeviceInfo;
    const PATH: &'static str = DEVICE_INFO_PATH;
}

/// `GET public/v1/audio/volume`
pub struct GetAudioVolumeOperation;

impl ReadOperation for GetAudioVolumeOperation {
    type Response = AudioVolume;
    const PATH: &'static str = AUDIO_VOLUME_PATH;
}

/// `GET public/v1/device/pwr`
pub struct GetDevicePowerOperation;

impl ReadOperation for GetDevicePowerOperation {
    type Response = DevicePower;
    const PATH: &'static str = DEVICE_POWER_PATH;
}

// ============================================================================
// Writes
// ============================================================================

/// `PUT public/v1/audio/volume` with a level
pub struct SetVolumeOperation;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetVolumeRequest {
    pub level: f64,
}

impl SetVolumeRequest {
    /// Clamp to the device range and round to one decimal
    pub fn new(level_db: f64) -> Result<Self> {
        let level = clamp_db(level_db)
            .ok_or_else(|| ApiError::InvalidParameter("level is NaN".to_string()))?;
        Ok(Self {
            level: round_db(level),
        })
    }
}

impl WriteOperation for SetVolumeOperation {
    type Request = SetVolumeRequest;
    const PATH: &'static str = AUDIO_VOLUME_PATH;
}

/// `PUT public/v1/audio/volume` with a mute flag
pub struct SetMuteOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetMuteRequest {
    pub mute: bool,
}

impl WriteOperation for SetMuteOperation {
    type Request = SetMuteRequest;
    const PATH: &'static str = AUDIO_VOLUME_PATH;
}

/// `PUT public/v1/device/pwr`
pub struct SetPowerOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetPowerRequest {
    state: PowerState,
}

impl SetPowerRequest {
    /// Only `Standby`, `Active` and `Boot` can be requested
    pub fn new(state: PowerState) -> Result<Self> {
        if state.is_requestable() {
            Ok(Self { state })
        } else {
            Err(ApiError::InvalidParameter(format!(
                "power state {} is report-only",
                state
            )))
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }
}

impl WriteOperation for SetPowerOperation {
    type Request = SetPowerRequest;
    const PATH: &'static str = DEVICE_POWER_PATH;
}

/// `PUT public/v1/profile/restore`
///
/// Loads a stored profile from flash and makes it active. With `startup`
/// set, the profile also becomes the one used after a power cycle; the
/// device falls back to profile 0 if it is missing at startup.
pub struct RestoreProfileOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreProfileRequest {
    pub id: u32,
    pub startup: bool,
}

impl WriteOperation for RestoreProfileOperation {
    type Request = RestoreProfileRequest;
    const PATH: &'static str = PROFILE_RESTORE_PATH;
}
