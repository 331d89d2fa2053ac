//! Units of work executed by the session worker

use std::fmt;
use std::sync::mpsc;
use std::time::Duration;

use smartip_api::{DeviceEndpoint, PowerState};

use crate::error::{Result, SessionError};

/// A command for the session worker
///
/// Commands carry data rather than behavior; the worker decides what each
/// one does against the device. `SetVolume` carries nothing because the
/// worker reads the latest requested level when it runs.
#[derive(Debug)]
pub enum Command {
    SetVolume,
    SetMute(bool),
    /// Invert the mute flag as known when the command runs
    ToggleMute,
    SetPower(PowerState),
    PollDeviceInfo,
    PollPowerAndAudio,
    PollAudio,
    RestoreProfile {
        id: u32,
        startup: bool,
    },
    CustomGet {
        path: String,
        reply: ReplySender<String>,
    },
    CustomPut {
        path: String,
        body: String,
        reply: ReplySender<()>,
    },
    SetEndpoint(DeviceEndpoint),
    /// Completes once everything queued before it has run
    Flush(ReplySender<()>),
}

impl Command {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetVolume => "set_volume",
            Command::SetMute(_) => "set_mute",
            Command::ToggleMute => "toggle_mute",
            Command::SetPower(_) => "set_power",
            Command::PollDeviceInfo => "poll_device_info",
            Command::PollPowerAndAudio => "poll_power_and_audio",
            Command::PollAudio => "poll_audio",
            Command::RestoreProfile { .. } => "restore_profile",
            Command::CustomGet { .. } => "custom_get",
            Command::CustomPut { .. } => "custom_put",
            Command::SetEndpoint(_) => "set_endpoint",
            Command::Flush(_) => "flush",
        }
    }
}

/// Create a connected reply pair
pub(crate) fn reply_channel<T>() -> (ReplySender<T>, Reply<T>) {
    let (tx, rx) = mpsc::channel();
    (ReplySender { tx }, Reply { rx })
}

/// Worker side of a [`Reply`]
pub struct ReplySender<T> {
    tx: mpsc::Sender<Result<T>>,
}

impl<T> ReplySender<T> {
    /// Deliver the result; a caller that stopped waiting is not an error
    pub(crate) fn send(self, result: Result<T>) {
        let _ = self.tx.send(result);
    }
}

impl<T> fmt::Debug for ReplySender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReplySender")
    }
}

/// Pending result of a queued request
///
/// The result arrives once the worker has executed the command. If the
/// command is discarded (the session shut down before reaching it) waiting
/// yields [`SessionError::ReplyDropped`].
///
/// # Example
///
/// ```rust,ignore
/// let reply = session.custom_get("public/v1/device/led")?;
/// let body = reply.wait_timeout(Duration::from_secs(5))?;
/// ```
pub struct Reply<T> {
    rx: mpsc::Receiver<Result<T>>,
}

impl<T> Reply<T> {
    /// Block until the worker produces the result
    pub fn wait(self) -> Result<T> {
        self.rx.recv().unwrap_or(Err(SessionError::ReplyDropped))
    }

    /// Block for at most `timeout`
    ///
    /// On [`SessionError::Timeout`] the command is still queued and the
    /// reply can be waited on again.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(SessionError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SessionError::ReplyDropped),
        }
    }

    /// Take the result if it has already arrived
    pub fn try_take(&self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(SessionError::ReplyDropped)),
        }
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply")
    }
}
