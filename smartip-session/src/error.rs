use smartip_api::ApiError;
use thiserror::Error;

/// Errors surfaced by the session engine
///
/// State-changing operations never return these; they report acceptance as
/// a `bool` and log failures from the worker. These errors come back from
/// construction, polling control and the reply-carrying custom requests.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Command queue is full")]
    QueueFull,

    #[error("Session is closed")]
    Closed,

    /// The command was discarded before producing a result
    #[error("Command was dropped before it produced a reply")]
    ReplyDropped,

    #[error("Timed out waiting for a reply")]
    Timeout,

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to spawn {0} thread: {1}")]
    Spawn(&'static str, std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
