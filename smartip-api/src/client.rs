use http_client::{DeviceEndpoint, HttpClient, Transport};

use crate::operation::{ReadOperation, WriteOperation};
use crate::{ApiError, Result};

/// A client for executing Smart IP operations against a device
///
/// This client bridges the stateless operation definitions and the actual
/// requests. It owns a [`Transport`], normally an [`HttpClient`], and takes
/// the endpoint per call so a single client can follow endpoint changes.
///
/// # Example
///
/// ```rust,no_run
/// use smartip_api::DeviceEndpoint;
/// use smartip_api::operation::GetAudioVolumeOperation;
/// use smartip_api::SmartIpClient;
///
/// let client = SmartIpClient::new();
/// let endpoint = DeviceEndpoint::new("192.168.1.50");
///
/// let volume = client.fetch::<GetAudioVolumeOperation>(&endpoint)?;
/// println!("level {} dB, muted: {}", volume.level_db, volume.mute);
/// # Ok::<(), smartip_api::ApiError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SmartIpClient<T = HttpClient> {
    transport: T,
}

impl SmartIpClient<HttpClient> {
    /// Create a client backed by a default [`HttpClient`]
    pub fn new() -> Self {
        Self {
            transport: HttpClient::new(),
        }
    }
}

impl Default for SmartIpClient<HttpClient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> SmartIpClient<T> {
    /// Create a client with a custom transport
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute a read operation and parse the response
    pub fn fetch<Op: ReadOperation>(&self, endpoint: &DeviceEndpoint) -> Result<Op::Response> {
        let body = self.get_raw(endpoint, Op::PATH)?;
        Op::parse_response(&body)
    }

    /// Execute a write operation; only a 200 reply counts as success
    pub fn execute<Op: WriteOperation>(
        &self,
        endpoint: &DeviceEndpoint,
        request: &Op::Request,
    ) -> Result<()> {
        let body = Op::build_body(request)?;
        self.put_raw(endpoint, Op::PATH, &body)
    }

    /// GET an arbitrary path and return the raw body
    pub fn get_raw(&self, endpoint: &DeviceEndpoint, path: &str) -> Result<String> {
        Ok(self.transport.get(endpoint, path)?)
    }

    /// PUT a raw body to an arbitrary path
    pub fn put_raw(&self, endpoint: &DeviceEndpoint, path: &str, body: &str) -> Result<()> {
        match self.transport.put(endpoint, path, body)? {
            200 => Ok(()),
            status => Err(ApiError::DeviceError {
                status,
                body: String::new(),
            }),
        }
    }
}
