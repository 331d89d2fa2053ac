//! Logging setup for applications embedding a session
//!
//! The crates only emit `tracing` events; nothing is printed until the host
//! application installs a subscriber. These helpers install one with sane
//! defaults for the common cases.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber, for hosts that render their own UI on the terminal
    Silent,
    /// Compact stderr output at info level
    Development,
    /// Verbose output with threads and source locations
    Debug,
    /// One JSON object per line, for log shippers
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid logging mode: {0}")]
    InvalidMode(String),
}

impl std::str::FromStr for LoggingMode {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(LoggingMode::Silent),
            "development" | "dev" => Ok(LoggingMode::Development),
            "debug" => Ok(LoggingMode::Debug),
            "json" => Ok(LoggingMode::Json),
            other => Err(LoggingError::InvalidMode(other.to_string())),
        }
    }
}

/// Install a global subscriber for `mode`
///
/// # Environment Variables
///
/// - `SMARTIP_LOG_LEVEL`: filter directive, e.g. `debug` or `smartip_session=trace`
/// - `RUST_LOG`: used when `SMARTIP_LOG_LEVEL` is unset
///
/// # Example
///
/// ```rust,ignore
/// smartip_session::logging::init_logging(LoggingMode::Development)?;
/// ```
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .with(create_env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .pretty()
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(create_env_filter("debug"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Json => Registry::default()
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .with(create_env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}

/// Install a subscriber chosen by `SMARTIP_LOG_MODE`
///
/// Unset means silent; an unrecognised value is an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var("SMARTIP_LOG_MODE") {
        Ok(value) => value.parse()?,
        Err(_) => LoggingMode::Silent,
    };

    init_logging(mode)
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("SMARTIP_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Whether a global subscriber is already installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
