//! Connection parameters for a single loudspeaker

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::HttpError;

/// Default Smart IP REST port
pub const DEFAULT_PORT: u16 = 9000;

/// Factory default username
pub const DEFAULT_USERNAME: &str = "admin";

/// Factory default password
pub const DEFAULT_PASSWORD: &str = "admin";

/// Host, port and basic-auth credentials of one device
///
/// The base URL (`http://host:port/`) is recomputed every time the host or
/// port changes, so request paths can be joined onto it directly.
/// Credentials never appear in the URL; they travel only in the
/// `Authorization` header built by [`DeviceEndpoint::authorization`].
///
/// # Example
///
/// ```rust
/// use http_client::DeviceEndpoint;
///
/// let mut endpoint = DeviceEndpoint::new("192.168.1.50");
/// assert_eq!(endpoint.port(), 9000);
///
/// endpoint.set_port(9100);
/// let url = endpoint.url_for("/device/info").unwrap();
/// assert_eq!(url.path(), "/device/info");
/// assert_eq!(url.port(), Some(9100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    host: String,
    port: u16,
    username: String,
    password: String,
    base_url: Option<Url>,
}

impl DeviceEndpoint {
    /// Endpoint on the default port with factory credentials
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_credentials(host, DEFAULT_PORT, DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }

    /// Endpoint with explicit port and credentials
    pub fn with_credentials(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut endpoint = Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            base_url: None,
        };
        endpoint.update_base_url();
        endpoint
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// The derived base URL, `None` while the host is empty or unusable
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
        self.update_base_url();
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
        self.update_base_url();
    }

    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.username = username.into();
        self.password = password.into();
    }

    /// `Authorization` header value for basic auth
    ///
    /// The raw `user:pass` pair is encoded as-is, so reserved characters
    /// in either half reach the device unchanged.
    pub fn authorization(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(pair))
    }

    /// Build the full request URL for a device path
    ///
    /// Leading slashes are ignored so `"/public/v1/audio/volume"` and
    /// `"public/v1/audio/volume"` address the same resource.
    pub fn url_for(&self, path: &str) -> Result<Url, HttpError> {
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| HttpError::InvalidUrl(format!("no usable host '{}'", self.host)))?;

        base.join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::InvalidUrl(e.to_string()))
    }

    fn update_base_url(&mut self) {
        self.base_url = if self.host.trim().is_empty() {
            None
        } else {
            Url::parse(&format!("http://{}:{}/", self.host.trim(), self.port)).ok()
        };
    }
}
