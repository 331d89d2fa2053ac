use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;

use smartip_api::{PowerState, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USERNAME};
use smartip_session::logging::{init_logging, LoggingMode};
use smartip_session::{SessionConfig, SessionEngine};

mod commands;
mod report;

/// Smart IP loudspeaker control
///
/// Every subcommand opens a session to one device, runs through the same
/// serialized command queue an embedding application would use, and waits
/// for the queue to drain before exiting.
#[derive(Parser, Debug)]
#[command(name = "smartip")]
#[command(about = "Control and monitor a Smart IP loudspeaker")]
#[command(version)]
pub struct Args {
    /// Device address
    #[arg(long, env = "SMARTIP_HOST")]
    pub host: String,

    /// Device API port
    #[arg(long, env = "SMARTIP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "SMARTIP_USER", default_value = DEFAULT_USERNAME)]
    pub username: String,

    #[arg(long, env = "SMARTIP_PASSWORD", default_value = DEFAULT_PASSWORD, hide_env_values = true)]
    pub password: String,

    /// Seconds to wait for replies
    #[arg(short, long, default_value = "5")]
    pub timeout: u64,

    /// Trace every request and reply (needs a debug-level log filter)
    #[arg(long)]
    pub debug: bool,

    /// Log output: silent, development, debug or json
    #[arg(long, env = "SMARTIP_LOG_MODE", default_value = "silent")]
    pub log_mode: LoggingMode,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show device identity
    Info,

    /// Show power, PoE and audio state
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the volume level
    Volume {
        /// Level in dB (-130 to 0), or a fraction with --percent
        #[arg(allow_negative_numbers = true)]
        level: f64,

        /// Interpret the level as a fraction of the range (0.0 to 1.0)
        #[arg(long)]
        percent: bool,
    },

    /// Mute the output
    Mute,

    /// Unmute the output
    Unmute,

    /// Invert the current mute flag
    ToggleMute,

    /// Request a power state (active, standby or boot)
    Power { state: PowerState },

    /// Recall a stored profile
    Profile {
        id: u32,

        /// Also use this profile after a power cycle
        #[arg(long)]
        startup: bool,
    },

    /// GET an arbitrary API path and print the body
    Get { path: String },

    /// PUT a raw JSON body to an arbitrary API path
    Put { path: String, body: String },

    /// Poll the device and print every change
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "5000")]
        interval_ms: u64,

        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,
    },
}

impl Args {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow::anyhow!("Host must not be empty"));
        }

        if self.timeout == 0 {
            return Err(anyhow::anyhow!("Timeout must be positive"));
        }

        if let Command::Watch { interval_ms: 0, .. } = self.command {
            return Err(anyhow::anyhow!("Poll interval must be positive"));
        }

        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.host.trim())
            .with_port(self.port)
            .with_credentials(self.username.clone(), self.password.clone())
            .with_debug(self.debug)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_mode).context("Failed to initialize logging")?;
    args.validate()?;

    tracing::debug!("connecting to {}:{}", args.host, args.port);
    let session = SessionEngine::new(args.session_config()).context("Failed to start session")?;

    let result = commands::run(&session, &args);
    session.shutdown();
    result
}
