//! Error types for the HTTP transport

use thiserror::Error;

/// Errors that can occur while talking to a loudspeaker over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Connection refused, timeout, DNS or socket failure, or a body that
    /// could not be read. The request never got a reply from the device.
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The device answered with an error status
    #[error("HTTP status {code}: {body}")]
    Status { code: u16, body: String },

    /// The endpoint could not be turned into a request URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl HttpError {
    /// Whether the device itself produced this error.
    ///
    /// Only a status reply proves the device is reachable; every other
    /// variant means the request never arrived.
    pub fn reached_device(&self) -> bool {
        matches!(self, HttpError::Status { .. })
    }
}

impl From<ureq::Error> for HttpError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(code, response) => HttpError::Status {
                code,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => HttpError::Network(transport.to_string()),
        }
    }
}
