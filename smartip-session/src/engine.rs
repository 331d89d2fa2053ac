//! Public session API
//!
//! A [`SessionEngine`] controls one loudspeaker. Every operation turns into
//! a [`Command`] on a bounded queue drained by a single worker thread, which
//! is the only code that talks to the device or writes state. Callers get an
//! immediate `bool` telling whether the work was accepted; outcomes arrive
//! as [`DeviceEvent`](crate::DeviceEvent)s and in [`SessionEngine::snapshot`].

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use smartip_api::volume::{clamp_db, percent_to_db};
use smartip_api::{DeviceEndpoint, DeviceInfo, HttpClient, PowerState, SmartIpClient, Transport};

use crate::command::{reply_channel, Command, Reply};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::event::EventBus;
use crate::executor::{Executor, VolumeTarget};
use crate::iter::EventIterator;
use crate::poller::Poller;
use crate::queue::{spawn_worker, CommandQueue};
use crate::state::{DeviceSnapshot, StateModel};

/// Control session for a single Smart IP loudspeaker
///
/// # Example
///
/// ```rust,ignore
/// use smartip_session::{SessionConfig, SessionEngine, DeviceEvent};
///
/// let session = SessionEngine::new(SessionConfig::new("192.168.1.50"))?;
/// let events = session.subscribe();
///
/// session.poll_device_info();
/// session.start_polling()?;
/// session.set_volume_db(-25.0);
///
/// for event in events.timeout_iter(Duration::from_secs(10)) {
///     if let DeviceEvent::LevelDb(db) = event {
///         println!("level is now {} dB", db);
///     }
/// }
///
/// session.shutdown();
/// ```
pub struct SessionEngine {
    queue: CommandQueue,
    state: StateModel,
    events: Arc<EventBus>,
    volume: Arc<VolumeTarget>,
    poller: Poller,
    poll_interval: Duration,
    endpoint: Mutex<DeviceEndpoint>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionEngine {
    /// Start a session over the default HTTP transport
    pub fn new(config: SessionConfig) -> Result<Self> {
        let transport = HttpClient::with_timeouts(config.connect_timeout, config.read_timeout);
        Self::with_transport(config, transport)
    }

    /// Start a session over a custom transport
    pub fn with_transport<T: Transport + 'static>(config: SessionConfig, transport: T) -> Result<Self> {
        config.validate()?;

        let (queue, receiver) = CommandQueue::bounded(config.queue_capacity);
        let state = StateModel::new();
        let events = Arc::new(EventBus::new());
        let volume = Arc::new(VolumeTarget::default());

        let executor = Executor::new(
            SmartIpClient::with_transport(transport),
            config.endpoint.clone(),
            state.clone(),
            Arc::clone(&events),
            queue.clone(),
            Arc::clone(&volume),
            config.debug,
        );
        let worker = spawn_worker(receiver, executor, config.command_cooldown)?;

        tracing::info!(
            "Session started for {}:{}",
            config.endpoint.host(),
            config.endpoint.port()
        );

        Ok(Self {
            poller: Poller::new(queue.clone()),
            queue,
            state,
            events,
            volume,
            poll_interval: config.poll_interval,
            endpoint: Mutex::new(config.endpoint),
            worker: Mutex::new(Some(worker)),
        })
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// Request a level in dB, clamped to `[-130, 0]`
    ///
    /// Requests made before the worker gets to the previous one replace it,
    /// so a burst of calls produces a single write with the last value.
    /// Returns `false` for NaN or when the queue rejects the command.
    pub fn set_volume_db(&self, level_db: f64) -> bool {
        let Some(level_db) = clamp_db(level_db) else {
            tracing::warn!("ignoring NaN volume request");
            return false;
        };

        self.volume
            .submit(level_db, || self.queue.enqueue(Command::SetVolume))
    }

    /// Request a level as a fraction of the device range
    pub fn set_volume_percent(&self, percent: f64) -> bool {
        match percent_to_db(percent) {
            Some(level_db) => self.set_volume_db(level_db),
            None => {
                tracing::warn!("ignoring NaN volume request");
                false
            }
        }
    }

    pub fn set_mute(&self, mute: bool) -> bool {
        self.queue.enqueue(Command::SetMute(mute))
    }

    /// Invert the mute flag as known when the command runs
    pub fn toggle_mute(&self) -> bool {
        self.queue.enqueue(Command::ToggleMute)
    }

    // ========================================================================
    // Power and profiles
    // ========================================================================

    /// Request a power state
    ///
    /// Only `Active`, `Standby` and `Boot` can be requested. Report-only
    /// states are rejected here without touching the queue.
    pub fn set_power(&self, state: PowerState) -> bool {
        if !state.is_requestable() {
            tracing::warn!("power state {} cannot be requested", state);
            return false;
        }
        self.queue.enqueue(Command::SetPower(state))
    }

    /// Load a stored profile, optionally making it the startup profile
    pub fn restore_profile(&self, id: u32, load_on_startup: bool) -> bool {
        self.queue.enqueue(Command::RestoreProfile {
            id,
            startup: load_on_startup,
        })
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Start periodic refreshes at the configured interval
    pub fn start_polling(&self) -> Result<()> {
        self.poller.start(self.poll_interval)
    }

    /// Start periodic refreshes, or change the interval if already running
    pub fn start_polling_every(&self, interval: Duration) -> Result<()> {
        self.poller.start(interval)
    }

    pub fn stop_polling(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn poll_device_info(&self) -> bool {
        self.queue.enqueue(Command::PollDeviceInfo)
    }

    /// Refresh power and PoE state, then audio if the device is active
    pub fn poll_power_and_audio(&self) -> bool {
        self.queue.enqueue(Command::PollPowerAndAudio)
    }

    // ========================================================================
    // Custom requests
    // ========================================================================

    /// Queue a GET of an arbitrary path and return a handle to its body
    pub fn custom_get(&self, path: impl Into<String>) -> Result<Reply<String>> {
        let (reply, pending) = reply_channel();
        self.queue.try_enqueue(Command::CustomGet {
            path: relative_path(path.into()),
            reply,
        })?;
        Ok(pending)
    }

    /// Queue a PUT of a raw JSON body to an arbitrary path
    pub fn custom_put(&self, path: impl Into<String>, body: impl Into<String>) -> Result<Reply<()>> {
        let (reply, pending) = reply_channel();
        self.queue.try_enqueue(Command::CustomPut {
            path: relative_path(path.into()),
            body: body.into(),
            reply,
        })?;
        Ok(pending)
    }

    /// Handle that completes once every command accepted so far has run
    ///
    /// Follow-up commands queued by those commands (the audio refresh after
    /// an active power poll) land behind the marker; flush twice to cover
    /// them too.
    pub fn flush(&self) -> Result<Reply<()>> {
        let (reply, pending) = reply_channel();
        self.queue.try_enqueue(Command::Flush(reply))?;
        Ok(pending)
    }

    // ========================================================================
    // Endpoint
    // ========================================================================

    pub fn endpoint(&self) -> DeviceEndpoint {
        self.endpoint.lock().clone()
    }

    /// Point the session at another address or credentials
    ///
    /// The change is queued, so commands accepted earlier still go to the
    /// previous endpoint.
    pub fn set_endpoint(&self, endpoint: DeviceEndpoint) -> bool {
        let mut current = self.endpoint.lock();
        if !self.queue.enqueue(Command::SetEndpoint(endpoint.clone())) {
            return false;
        }
        *current = endpoint;
        true
    }

    pub fn set_host(&self, host: impl Into<String>) -> bool {
        let mut endpoint = self.endpoint();
        endpoint.set_host(host);
        self.set_endpoint(endpoint)
    }

    pub fn set_port(&self, port: u16) -> bool {
        let mut endpoint = self.endpoint();
        endpoint.set_port(port);
        self.set_endpoint(endpoint)
    }

    pub fn set_credentials(&self, username: impl Into<String>, password: impl Into<String>) -> bool {
        let mut endpoint = self.endpoint();
        endpoint.set_credentials(username, password);
        self.set_endpoint(endpoint)
    }

    // ========================================================================
    // State and events
    // ========================================================================

    pub fn subscribe(&self) -> EventIterator {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.state.snapshot()
    }

    pub fn is_responding(&self) -> bool {
        self.state.snapshot().responding
    }

    pub fn level_db(&self) -> Option<f64> {
        self.state.snapshot().level_db
    }

    pub fn level_percent(&self) -> Option<f64> {
        self.state.snapshot().level_percent()
    }

    pub fn mute(&self) -> bool {
        self.state.snapshot().mute
    }

    pub fn power_state(&self) -> PowerState {
        self.state.snapshot().power_state
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.state.snapshot().device_info
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop polling and close the queue
    ///
    /// Commands accepted before this call still execute; anything offered
    /// afterwards is rejected. Does not wait for the worker.
    pub fn dispose(&self) {
        self.poller.stop();
        if self.queue.close() {
            tracing::info!("Session disposed");
        }
    }

    /// Dispose and wait for the worker to finish the backlog
    pub fn shutdown(&self) {
        self.dispose();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("session worker panicked");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Commands waiting for the worker
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }
}

fn relative_path(path: String) -> String {
    match path.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => path,
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
