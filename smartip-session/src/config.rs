//! Configuration for a device session
//!
//! Defines where the device lives and how the session paces its traffic:
//! queue depth, cooldown between commands, polling cadence and HTTP timeouts.

use std::time::Duration;

use smartip_api::DeviceEndpoint;

use crate::error::{Result, SessionError};

/// Configuration for a [`SessionEngine`](crate::SessionEngine)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address and credentials of the device
    /// Default: empty host, port 9000, admin/admin
    pub endpoint: DeviceEndpoint,

    /// Maximum number of commands waiting for the worker
    /// Default: 20
    pub queue_capacity: usize,

    /// Pause after each executed command
    /// Default: 100 milliseconds
    pub command_cooldown: Duration,

    /// Interval used by `start_polling`
    /// Default: 5 seconds
    pub poll_interval: Duration,

    /// TCP connect timeout for the default HTTP transport
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Response read timeout for the default HTTP transport
    /// Default: 10 seconds
    pub read_timeout: Duration,

    /// Trace every request and reply at debug level
    /// Default: false
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DeviceEndpoint::new(""),
            queue_capacity: 20,
            command_cooldown: Duration::from_millis(100),
            poll_interval: Duration::from_millis(5000),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            debug: false,
        }
    }
}

impl SessionConfig {
    /// Default configuration for the device at `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self::default().with_host(host)
    }

    /// Polls every second, for panels that show live meters
    pub fn fast_polling() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            ..Default::default()
        }
    }

    /// Polls every 30 seconds and waits longer between commands, for large
    /// installations sharing one network segment
    pub fn low_traffic() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            command_cooldown: Duration::from_millis(250),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(SessionError::Config(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(SessionError::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(SessionError::Config(
                "HTTP timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.endpoint.set_host(host);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.endpoint.set_port(port);
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.endpoint.set_credentials(username, password);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_command_cooldown(mut self, cooldown: Duration) -> Self {
        self.command_cooldown = cooldown;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
