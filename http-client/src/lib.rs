//! Private HTTP transport for Smart IP loudspeakers
//!
//! This crate provides a minimal blocking REST client for talking to a single
//! loudspeaker over its JSON control surface. It knows nothing about the
//! protocol's resources; it only issues GET/PUT requests with basic-auth
//! credentials and classifies what went wrong:
//!
//! - a body or status code when the device accepted the request,
//! - [`HttpError::Status`] when the device answered with an error,
//! - [`HttpError::Network`] / [`HttpError::InvalidUrl`] when it never got there.

mod endpoint;
mod error;

pub use endpoint::{DeviceEndpoint, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USERNAME};
pub use error::HttpError;

use std::sync::Arc;
use std::time::Duration;

/// The request surface the session engine consumes
///
/// Implemented by [`HttpClient`] for real devices; tests substitute their own
/// implementation to script replies and failures.
pub trait Transport: Send + Sync {
    /// Issue a GET and return the response body on a 2xx/3xx reply
    fn get(&self, endpoint: &DeviceEndpoint, path: &str) -> Result<String, HttpError>;

    /// Issue a PUT with a JSON body and return the status code of a
    /// non-error reply
    fn put(&self, endpoint: &DeviceEndpoint, path: &str, body: &str) -> Result<u16, HttpError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, endpoint: &DeviceEndpoint, path: &str) -> Result<String, HttpError> {
        (**self).get(endpoint, path)
    }

    fn put(&self, endpoint: &DeviceEndpoint, path: &str, body: &str) -> Result<u16, HttpError> {
        (**self).put(endpoint, path, body)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, endpoint: &DeviceEndpoint, path: &str) -> Result<String, HttpError> {
        (**self).get(endpoint, path)
    }

    fn put(&self, endpoint: &DeviceEndpoint, path: &str, body: &str) -> Result<u16, HttpError> {
        (**self).put(endpoint, path, body)
    }
}

/// A minimal blocking HTTP client for loudspeaker communication
///
/// Idle connections are never pooled: the device's control stack handles one
/// request at a time and some firmware versions hang on reused sockets.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    /// Create a client with the default timeouts (5s connect, 10s read)
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a client with custom connect and read timeouts
    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .max_idle_connections(0)
                .build(),
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpClient {
    fn get(&self, endpoint: &DeviceEndpoint, path: &str) -> Result<String, HttpError> {
        let url = endpoint.url_for(path)?;

        let response = self
            .agent
            .get(url.as_str())
            .set("Authorization", &endpoint.authorization())
            .set("Accept", "application/json")
            .call()?;

        response
            .into_string()
            .map_err(|e| HttpError::Network(e.to_string()))
    }

    fn put(&self, endpoint: &DeviceEndpoint, path: &str, body: &str) -> Result<u16, HttpError> {
        let url = endpoint.url_for(path)?;

        let response = self
            .agent
            .put(url.as_str())
            .set("Authorization", &endpoint.authorization())
            .set("Accept", "application/json")
            .set("Content-Type", "application/json")
            .send_string(body)?;

        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let _client = HttpClient::new();
        let _default_client = HttpClient::default();
        let _custom = HttpClient::with_timeouts(Duration::from_millis(200), Duration::from_secs(1));
    }

    #[test]
    fn test_empty_host_fails_before_connecting() {
        let client = HttpClient::new();
        let endpoint = DeviceEndpoint::new("");

        let result = client.get(&endpoint, "device/info");
        match result {
            Err(error @ HttpError::InvalidUrl(_)) => assert!(!error.reached_device()),
            other => panic!("Expected HttpError::InvalidUrl, got {:?}", other),
        }
    }

    #[test]
    fn test_arc_transport_delegates() {
        let client: Arc<dyn Transport> = Arc::new(HttpClient::new());
        let endpoint = DeviceEndpoint::new("");
        assert!(client.put(&endpoint, "public/v1/audio/volume", "{}").is_err());
    }
}
