//! Virtual-home backends.
//!
//! A backend is the fleet service that creates homes, reports the devices it started,
//! runs commands inside them and hands back their console logs.
//!
//! # Design
//!
//! The trait is async and stateless with respect to the scenario: every call names the
//! home it targets. [`VirtualHome`](crate::home::VirtualHome) layers the session state
//! (current home, device list, logging) on top.
//!
//! - [`CirqueClient`] talks to a Cirque REST service.
//! - [`MockHome`] is an in-memory scripted fleet for tests.

mod cirque;
mod mock;

pub use cirque::{CirqueClient, CirqueConfig};
pub use mock::MockHome;

use async_trait::async_trait;
use mesh_types::{DeviceConfig, DeviceDescriptor, DeviceId, ExecutionResult, HomeId};
use thiserror::Error;

/// Backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not reach the service.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request failed or returned a non-success status.
    #[error("http error: {0}")]
    Http(String),

    /// Response body did not have the expected shape.
    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse {
        /// Endpoint that produced the response.
        endpoint: String,
        /// What was wrong.
        detail: String,
    },

    /// Home id not known to the service.
    #[error("unknown home: {0}")]
    UnknownHome(HomeId),

    /// Device id not known to the service.
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// No home has been created in this session.
    #[error("no home has been created")]
    NoHome,

    /// Failure scripted by a test backend.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            BackendError::ConnectionFailed(e.to_string())
        } else {
            BackendError::Http(e.to_string())
        }
    }
}

/// Fleet service that hosts virtual homes.
#[async_trait]
pub trait HomeBackend: Send + Sync {
    /// Create a home from a topology and return its id.
    async fn create_home(&self, config: &DeviceConfig) -> Result<HomeId, BackendError>;

    /// Ids of every home the service currently runs.
    async fn list_homes(&self) -> Result<Vec<HomeId>, BackendError>;

    /// Devices of a home, access points included.
    async fn home_devices(&self, home: &HomeId) -> Result<Vec<DeviceDescriptor>, BackendError>;

    /// Run a shell command on a device and wait for it to finish.
    async fn device_cmd(
        &self,
        home: &HomeId,
        device: &DeviceId,
        command: &str,
    ) -> Result<ExecutionResult, BackendError>;

    /// Full console log of a device.
    async fn device_log(&self, home: &HomeId, device: &DeviceId) -> Result<Vec<u8>, BackendError>;

    /// Tear a home down.
    async fn destroy_home(&self, home: &HomeId) -> Result<(), BackendError>;
}
