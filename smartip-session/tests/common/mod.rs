//! Scriptable in-memory device shared by the session integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use smartip_api::{DeviceEndpoint, HttpError, Transport};
use smartip_session::{SessionConfig, SessionEngine};

pub const POWER_PATH: &str = "public/v1/device/pwr";
pub const VOLUME_PATH: &str = "public/v1/audio/volume";
pub const INFO_PATH: &str = "device/info";

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: &'static str,
    pub host: String,
    pub path: String,
    pub body: String,
}

#[derive(Default)]
struct Inner {
    get_replies: Mutex<HashMap<String, Result<String, HttpError>>>,
    put_statuses: Mutex<HashMap<String, u16>>,
    requests: Mutex<Vec<Request>>,
    offline: AtomicBool,
    held: Mutex<bool>,
    released: Condvar,
}

/// A fake loudspeaker
///
/// GET replies are sticky per path, PUTs answer 200 unless scripted.
/// `hold()` parks every request inside the transport until `release()`,
/// which keeps the worker busy while a test piles up commands.
#[derive(Clone, Default)]
pub struct MockDevice {
    inner: Arc<Inner>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_get(&self, path: &str, body: &str) {
        self.inner
            .get_replies
            .lock()
            .unwrap()
            .insert(path.to_string(), Ok(body.to_string()));
    }

    pub fn fail_get(&self, path: &str, status: u16) {
        self.inner.get_replies.lock().unwrap().insert(
            path.to_string(),
            Err(HttpError::Status {
                code: status,
                body: String::new(),
            }),
        );
    }

    pub fn reply_put(&self, path: &str, status: u16) {
        self.inner
            .put_statuses
            .lock()
            .unwrap()
            .insert(path.to_string(), status);
    }

    pub fn set_power(&self, state: &str) {
        self.reply_get(
            POWER_PATH,
            &format!(r#"{{"state":"{}","poeAllocatedPwr":15.4,"poePd15W":true}}"#, state),
        );
    }

    pub fn set_audio(&self, level: f64, mute: bool) {
        self.reply_get(VOLUME_PATH, &format!(r#"{{"level":{:?},"mute":{}}}"#, level, mute));
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    pub fn hold(&self) {
        *self.inner.held.lock().unwrap() = true;
    }

    pub fn release(&self) {
        *self.inner.held.lock().unwrap() = false;
        self.inner.released.notify_all();
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn puts_to(&self, path: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "PUT" && r.path == path)
            .map(|r| r.body)
            .collect()
    }

    fn record(&self, method: &'static str, endpoint: &DeviceEndpoint, path: &str, body: &str) {
        self.inner.requests.lock().unwrap().push(Request {
            method,
            host: endpoint.host().to_string(),
            path: path.to_string(),
            body: body.to_string(),
        });

        let mut held = self.inner.held.lock().unwrap();
        while *held {
            held = self.inner.released.wait(held).unwrap();
        }
    }

    fn offline_error() -> HttpError {
        HttpError::Network("connection refused".to_string())
    }
}

impl Transport for MockDevice {
    fn get(&self, endpoint: &DeviceEndpoint, path: &str) -> Result<String, HttpError> {
        self.record("GET", endpoint, path, "");
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Self::offline_error());
        }

        self.inner
            .get_replies
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or(Err(HttpError::Status {
                code: 404,
                body: String::new(),
            }))
    }

    fn put(&self, endpoint: &DeviceEndpoint, path: &str, body: &str) -> Result<u16, HttpError> {
        self.record("PUT", endpoint, path, body);
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Self::offline_error());
        }

        Ok(*self.inner.put_statuses.lock().unwrap().get(path).unwrap_or(&200))
    }
}

/// Session against `device` with no cooldown
pub fn session(device: &MockDevice) -> SessionEngine {
    let config = SessionConfig::new("192.168.1.50").with_command_cooldown(Duration::ZERO);
    SessionEngine::with_transport(config, device.clone()).unwrap()
}

/// Poll `condition` until it holds or two seconds pass
pub fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
