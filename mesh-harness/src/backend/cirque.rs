//! Cirque REST client.
//!
//! Cirque runs each virtual device as a container and exposes a small HTTP API:
//!
//! | Endpoint | Method | Returns |
//! |----------|--------|---------|
//! | `create_home` | POST (JSON topology) | home id |
//! | `get_homes` | GET | list of home ids |
//! | `home_devices/<home>` | GET | map of device id to descriptor |
//! | `device_cmd/<home>/<device>/<command>` | GET | `{return_code, output}` |
//! | `device_log/<home>/<device>` | GET | raw log bytes |
//! | `destroy_home/<home>` | GET | - |

use async_trait::async_trait;
use mesh_types::{DeviceConfig, DeviceDescriptor, DeviceId, ExecutionResult, HomeId};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{BackendError, HomeBackend};

/// Cirque client configuration.
#[derive(Debug, Clone)]
pub struct CirqueConfig {
    /// Base URL of the Cirque service.
    pub base_url: String,
    /// Per-request timeout. Bounds how long a remote command may run.
    pub request_timeout: Duration,
}

impl Default for CirqueConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Client for the Cirque HTTP API.
pub struct CirqueClient {
    config: CirqueConfig,
    http: reqwest::Client,
}

impl CirqueClient {
    /// Create a new client.
    pub fn new(config: CirqueConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the URL for an endpoint with path arguments.
    pub fn endpoint_url(&self, endpoint: &str, args: &[&str]) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| BackendError::Http(format!("invalid base url {}: {}", self.config.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Http(format!("base url {} cannot take a path", self.config.base_url)))?
            .pop_if_empty()
            .push(endpoint)
            .extend(args);
        Ok(url)
    }

    /// Build the URL that runs `command` on a device.
    ///
    /// The command becomes trailing path segments; `/` is kept as a separator and every
    /// other reserved character is percent-encoded.
    pub fn command_url(
        &self,
        home: &HomeId,
        device: &DeviceId,
        command: &str,
    ) -> Result<Url, BackendError> {
        let mut url = self.endpoint_url("device_cmd", &[home.as_str(), device.as_str()])?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Http("device_cmd url cannot take a path".into()))?
            .extend(command.split('/'));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: Url) -> Result<T, BackendError> {
        let response = self.http.get(url).send().await?;
        let response = check_status(endpoint, response).await?;
        response.json().await.map_err(|e| BackendError::MalformedResponse {
            endpoint: endpoint.into(),
            detail: e.to_string(),
        })
    }
}

async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Http(format!(
        "{} returned {}: {}",
        endpoint, status, body
    )))
}

#[async_trait]
impl HomeBackend for CirqueClient {
    async fn create_home(&self, config: &DeviceConfig) -> Result<HomeId, BackendError> {
        let url = self.endpoint_url("create_home", &[])?;
        let response = self.http.post(url).json(config).send().await?;
        let response = check_status("create_home", response).await?;
        response
            .json::<HomeId>()
            .await
            .map_err(|e| BackendError::MalformedResponse {
                endpoint: "create_home".into(),
                detail: e.to_string(),
            })
    }

    async fn list_homes(&self) -> Result<Vec<HomeId>, BackendError> {
        let url = self.endpoint_url("get_homes", &[])?;
        self.get_json("get_homes", url).await
    }

    async fn home_devices(&self, home: &HomeId) -> Result<Vec<DeviceDescriptor>, BackendError> {
        let url = self.endpoint_url("home_devices", &[home.as_str()])?;
        let devices: BTreeMap<String, DeviceDescriptor> = self.get_json("home_devices", url).await?;
        Ok(devices.into_values().collect())
    }

    async fn device_cmd(
        &self,
        home: &HomeId,
        device: &DeviceId,
        command: &str,
    ) -> Result<ExecutionResult, BackendError> {
        let url = self.command_url(home, device, command)?;
        self.get_json("device_cmd", url).await
    }

    async fn device_log(&self, home: &HomeId, device: &DeviceId) -> Result<Vec<u8>, BackendError> {
        let url = self.endpoint_url("device_log", &[home.as_str(), device.as_str()])?;
        let response = self.http.get(url).send().await?;
        let response = check_status("device_log", response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn destroy_home(&self, home: &HomeId) -> Result<(), BackendError> {
        let url = self.endpoint_url("destroy_home", &[home.as_str()])?;
        let response = self.http.get(url).send().await?;
        check_status("destroy_home", response).await?;
        Ok(())
    }
}
