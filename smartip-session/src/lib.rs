//! Serialized control session for Smart IP loudspeakers
//!
//! One [`SessionEngine`] per device. All traffic to the device flows through
//! a bounded FIFO queue drained by a single worker, with a short cooldown
//! between commands. The worker mirrors the device into a [`StateModel`] and
//! publishes a [`DeviceEvent`] for every property that actually changed.
//!
//! ```text
//! callers ──enqueue──▶ CommandQueue (20) ──▶ worker ──▶ Transport ──▶ device
//!                          ▲                   │
//!               Poller ────┘                   ├──▶ StateModel ──▶ snapshot()
//!                                              └──▶ EventBus   ──▶ subscribe()
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use smartip_session::{PowerState, SessionConfig, SessionEngine};
//!
//! let session = SessionEngine::new(SessionConfig::new("192.168.1.50"))?;
//! session.set_power(PowerState::Active);
//! session.set_volume_percent(0.6);
//! session.shutdown();
//! ```

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
mod executor;
pub mod iter;
pub mod logging;
pub mod poller;
pub mod queue;
pub mod state;

pub use command::{Command, Reply};
pub use config::SessionConfig;
pub use engine::SessionEngine;
pub use error::{Result, SessionError};
pub use event::{DeviceEvent, EventBus};
pub use iter::EventIterator;
pub use state::{DeviceSnapshot, StateModel};

pub use smartip_api::{ApiError, DeviceEndpoint, DeviceInfo, PowerState, Transport};
