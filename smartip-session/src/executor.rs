//! Command execution against the device
//!
//! The executor lives on the worker thread and is the only writer of the
//! [`StateModel`]. Each request outcome feeds the `Responding` flag: any
//! reply from the device (even an error status) proves it is reachable,
//! while a transport failure proves it is not.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use smartip_api::operation::{
    GetAudioVolumeOperation, GetDeviceInfoOperation, GetDevicePowerOperation, ReadOperation,
    RestoreProfileOperation, RestoreProfileRequest, SetMuteOperation, SetMuteRequest,
    SetPowerOperation, SetPowerRequest, SetVolumeOperation, SetVolumeRequest, WriteOperation,
};
use smartip_api::volume::db_to_percent;
use smartip_api::{ApiError, DeviceEndpoint, PowerState, SmartIpClient, Transport};

use crate::command::Command;
use crate::error::SessionError;
use crate::event::{DeviceEvent, EventBus};
use crate::queue::{CommandHandler, CommandQueue};
use crate::state::{AllocatedPower, LevelDb, Mute, Poe15W, Power, Responding, StateModel};

/// Latest requested volume, shared between callers and the worker
///
/// Rapid volume requests collapse into one queued command: callers overwrite
/// the target and only enqueue when no volume command is pending. The worker
/// clears the pending flag before reading the target, so a request arriving
/// mid-execution always results in another command.
#[derive(Debug, Default)]
pub(crate) struct VolumeTarget {
    level_db: AtomicU64,
    pending: AtomicBool,
    // Held across the pending check and the enqueue attempt
    submit: Mutex<()>,
}

impl VolumeTarget {
    /// Record `level_db` and queue a command through `enqueue` unless one
    /// is already pending
    ///
    /// Returns whether a command carrying this level will run.
    pub(crate) fn submit(&self, level_db: f64, enqueue: impl FnOnce() -> bool) -> bool {
        self.level_db.store(level_db.to_bits(), Ordering::SeqCst);

        let _guard = self.submit.lock();
        if self.pending.swap(true, Ordering::SeqCst) {
            return true;
        }

        if enqueue() {
            true
        } else {
            self.pending.store(false, Ordering::SeqCst);
            false
        }
    }

    fn take(&self) -> f64 {
        self.pending.store(false, Ordering::SeqCst);
        f64::from_bits(self.level_db.load(Ordering::SeqCst))
    }
}

pub(crate) struct Executor<T> {
    client: SmartIpClient<T>,
    endpoint: DeviceEndpoint,
    state: StateModel,
    events: Arc<EventBus>,
    queue: CommandQueue,
    volume: Arc<VolumeTarget>,
    last_info_payload: Option<String>,
    debug: bool,
}

impl<T: Transport> Executor<T> {
    pub(crate) fn new(
        client: SmartIpClient<T>,
        endpoint: DeviceEndpoint,
        state: StateModel,
        events: Arc<EventBus>,
        queue: CommandQueue,
        volume: Arc<VolumeTarget>,
        debug: bool,
    ) -> Self {
        Self {
            client,
            endpoint,
            state,
            events,
            queue,
            volume,
            last_info_payload: None,
            debug,
        }
    }

    fn run(&mut self, command: Command) -> Result<(), ApiError> {
        match command {
            Command::SetVolume => self.set_volume(),
            Command::SetMute(mute) => self.set_mute(mute),
            Command::ToggleMute => {
                let mute = !self.state.get::<Mute>();
                self.set_mute(mute)
            }
            Command::SetPower(state) => self.set_power(state),
            Command::PollDeviceInfo => self.poll_device_info(),
            Command::PollPowerAndAudio => self.poll_power_and_audio(),
            Command::PollAudio => self.poll_audio(),
            Command::RestoreProfile { id, startup } => self.restore_profile(id, startup),
            Command::CustomGet { path, reply } => {
                let result = self.get_raw(&path);
                reply.send(result.clone().map_err(SessionError::from));
                result.map(|_| ())
            }
            Command::CustomPut { path, body, reply } => {
                let result = self.put_raw(&path, &body);
                reply.send(result.clone().map_err(SessionError::from));
                result
            }
            Command::SetEndpoint(endpoint) => {
                tracing::info!("endpoint now {}:{}", endpoint.host(), endpoint.port());
                self.endpoint = endpoint;
                self.last_info_payload = None;
                Ok(())
            }
            Command::Flush(reply) => {
                reply.send(Ok(()));
                Ok(())
            }
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn set_volume(&mut self) -> Result<(), ApiError> {
        let level_db = self.volume.take();
        let request = SetVolumeRequest::new(level_db)?;
        self.send::<SetVolumeOperation>(&request)?;
        self.apply_level(level_db);
        Ok(())
    }

    fn set_mute(&mut self, mute: bool) -> Result<(), ApiError> {
        self.send::<SetMuteOperation>(&SetMuteRequest { mute })?;
        self.apply_mute(mute);
        Ok(())
    }

    fn set_power(&mut self, state: PowerState) -> Result<(), ApiError> {
        let request = SetPowerRequest::new(state)?;
        self.send::<SetPowerOperation>(&request)?;
        self.apply_power(state);
        Ok(())
    }

    fn restore_profile(&mut self, id: u32, startup: bool) -> Result<(), ApiError> {
        self.send::<RestoreProfileOperation>(&RestoreProfileRequest { id, startup })?;
        tracing::info!("profile {} restored (startup: {})", id, startup);
        self.events.emit(DeviceEvent::ProfileRestored(id));
        Ok(())
    }

    fn poll_device_info(&mut self) -> Result<(), ApiError> {
        let body = self.get_raw(GetDeviceInfoOperation::PATH)?;
        if self.last_info_payload.as_deref() == Some(body.as_str()) {
            return Ok(());
        }

        let info = GetDeviceInfoOperation::parse_response(&body)?;
        self.last_info_payload = Some(body);
        self.state.replace_device_info(info.clone());
        self.events.emit(DeviceEvent::DeviceInfo(info));
        Ok(())
    }

    fn poll_power_and_audio(&mut self) -> Result<(), ApiError> {
        let power = self.fetch::<GetDevicePowerOperation>()?;

        self.apply_power(power.state);
        if self.state.update::<AllocatedPower>(power.allocated_power) {
            self.events.emit(DeviceEvent::AllocatedPower(power.allocated_power));
        }
        if self.state.update::<Poe15W>(power.poe_15w) {
            self.events.emit(DeviceEvent::Poe15W(power.poe_15w));
        }

        // Audio is only meaningful while the amplifier is up
        if power.state == PowerState::Active && !self.queue.enqueue(Command::PollAudio) {
            tracing::warn!("could not queue audio refresh");
        }
        Ok(())
    }

    fn poll_audio(&mut self) -> Result<(), ApiError> {
        let volume = self.fetch::<GetAudioVolumeOperation>()?;
        self.apply_level(volume.level_db);
        self.apply_mute(volume.mute);
        Ok(())
    }

    // ========================================================================
    // State
    // ========================================================================

    fn apply_level(&self, level_db: f64) {
        if self.state.update::<LevelDb>(Some(level_db)) {
            self.events.emit(DeviceEvent::LevelDb(level_db));
            self.events.emit(DeviceEvent::LevelPercent(db_to_percent(level_db)));
        }
    }

    fn apply_mute(&self, mute: bool) {
        if self.state.update::<Mute>(mute) {
            self.events.emit(DeviceEvent::Mute(mute));
        }
    }

    fn apply_power(&self, state: PowerState) {
        if self.state.update::<Power>(state) {
            tracing::info!("power state now {}", state);
            self.events.emit(DeviceEvent::PowerState(state));
        }
    }

    fn observe<R>(&self, result: &Result<R, ApiError>) {
        let responding = match result {
            Ok(_) => Some(true),
            Err(e) => e.responding(),
        };

        if let Some(responding) = responding {
            if self.state.update::<Responding>(responding) {
                tracing::info!("device {} responding: {}", self.endpoint.host(), responding);
                self.events.emit(DeviceEvent::Responding(responding));
            }
        }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    fn fetch<Op: ReadOperation>(&mut self) -> Result<Op::Response, ApiError> {
        let body = self.get_raw(Op::PATH)?;
        Op::parse_response(&body)
    }

    fn send<Op: WriteOperation>(&mut self, request: &Op::Request) -> Result<(), ApiError> {
        let body = Op::build_body(request)?;
        self.put_raw(Op::PATH, &body)
    }

    fn get_raw(&mut self, path: &str) -> Result<String, ApiError> {
        if self.debug {
            tracing::debug!("GET {} from {}", path, self.endpoint.host());
        }

        let result = self.client.get_raw(&self.endpoint, path);
        if self.debug {
            match &result {
                Ok(body) => tracing::debug!("GET {} -> {}", path, body),
                Err(e) => tracing::debug!("GET {} failed: {}", path, e),
            }
        }

        self.observe(&result);
        result
    }

    fn put_raw(&mut self, path: &str, body: &str) -> Result<(), ApiError> {
        if self.debug {
            tracing::debug!("PUT {} to {}: {}", path, self.endpoint.host(), body);
        }

        let result = self.client.put_raw(&self.endpoint, path, body);
        if self.debug {
            match &result {
                Ok(()) => tracing::debug!("PUT {} -> 200", path),
                Err(e) => tracing::debug!("PUT {} failed: {}", path, e),
            }
        }

        self.observe(&result);
        result
    }
}

impl<T: Transport + 'static> CommandHandler for Executor<T> {
    fn handle(&mut self, command: Command) {
        let name = command.name();
        if let Err(e) = self.run(command) {
            log_failure(name, &e);
        }
    }
}

fn log_failure(command: &str, error: &ApiError) {
    match error {
        ApiError::NetworkError(_) => tracing::error!("{} failed: {}", command, error),
        ApiError::DeviceError { body, .. } => {
            tracing::debug!("{} rejected: {} {}", command, error, body)
        }
        ApiError::ParseError(_) => tracing::warn!("{} got an unreadable reply: {}", command, error),
        ApiError::InvalidParameter(_) => tracing::warn!("{} not sent: {}", command, error),
    }
}
