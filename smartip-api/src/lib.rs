//! Type-safe API for Smart IP loudspeakers
//!
//! The loudspeaker exposes a small REST surface: identity, volume/mute,
//! power/PoE and profile recall, each a fixed path with a JSON body. This
//! crate maps those resources to typed operations and models and executes
//! them through an injectable [`http_client::Transport`].
//!
//! ```text
//! SmartIpClient<T: Transport>
//!     │
//!     ├── fetch::<ReadOperation>()    GET  -> typed response
//!     ├── execute::<WriteOperation>() PUT  -> 200 or ApiError::DeviceError
//!     └── get_raw() / put_raw()       custom passthrough
//! ```

pub mod client;
pub mod error;
pub mod model;
pub mod operation;
pub mod volume;

pub use client::SmartIpClient;
pub use error::{ApiError, Result};
pub use model::{AudioVolume, DeviceInfo, DevicePower, PowerState};

// Re-export the transport surface so downstream crates need one import
pub use http_client::{
    DeviceEndpoint, HttpClient, HttpError, Transport, DEFAULT_PASSWORD, DEFAULT_PORT,
    DEFAULT_USERNAME,
};
