use http_client::HttpError;
use thiserror::Error;

/// High-level API errors for Smart IP operations
///
/// This enum keeps the distinction the session engine needs: whether the
/// device answered at all. Anything that came back from the device, even an
/// error status or an unreadable body, proves the device is reachable.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// Connection refused, timeouts, DNS failures or an unusable endpoint.
    /// The request never reached the device.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The device rejected the request
    ///
    /// Covers HTTP error statuses as well as PUT replies other than 200.
    #[error("Device returned status {status}")]
    DeviceError { status: u16, body: String },

    /// Response parsing error
    ///
    /// The device replied but the body did not match the expected schema.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid parameter value
    ///
    /// Raised before any request is made, e.g. requesting a report-only
    /// power state.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// What this error says about device reachability
    ///
    /// `Some(false)` for transport failures, `Some(true)` when the device
    /// replied, `None` when no request was attempted.
    pub fn responding(&self) -> Option<bool> {
        match self {
            ApiError::NetworkError(_) => Some(false),
            ApiError::DeviceError { .. } | ApiError::ParseError(_) => Some(true),
            ApiError::InvalidParameter(_) => None,
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<HttpError> for ApiError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Network(msg) => ApiError::NetworkError(msg),
            HttpError::InvalidUrl(msg) => ApiError::NetworkError(msg),
            HttpError::Status { code, body } => ApiError::DeviceError { status: code, body },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::ParseError(error.to_string())
    }
}
