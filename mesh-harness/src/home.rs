//! Virtual home session.
//!
//! [`VirtualHome`] owns one home on a [`HomeBackend`] for the length of a scenario: it
//! creates and checks the home, runs commands on its devices, watches their logs, resets
//! their mesh state and finally archives the logs and tears the home down.

use async_trait::async_trait;
use mesh_types::{
    DeviceConfig, DeviceDescriptor, DeviceId, ExecutionResult, HomeDevices, HomeId,
    RoleExpectation, ThreadRole,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::backend::{BackendError, HomeBackend};
use crate::error::ScenarioError;
use crate::poller::{self, PollError, RoleProbe, DEFAULT_POLL_INTERVAL};

const STATE_COMMAND: &str = "ot-ctl state";
const FACTORY_RESET_COMMAND: &str = "ot-ctl factoryreset";

/// Readiness markers and timeouts used by [`VirtualHome::reset_thread_devices`].
#[derive(Debug, Clone)]
pub struct ResetPolicy {
    /// Log line printed once the device's border agent is up.
    pub agent_marker: String,
    /// How long to wait for `agent_marker`.
    pub agent_timeout: Duration,
    /// Log line printed once the device's protocol server is listening.
    pub server_marker: String,
    /// How long to wait for `server_marker`.
    pub server_timeout: Duration,
    /// How long a device may take to report `disabled` after a factory reset.
    pub disabled_timeout: Duration,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self {
            agent_marker: "Border router agent started.".into(),
            agent_timeout: Duration::from_secs(10),
            server_marker: "[SVR] Server Listening...".into(),
            server_timeout: Duration::from_secs(15),
            disabled_timeout: Duration::from_secs(10),
        }
    }
}

/// Polling intervals and reset policy for a home session.
#[derive(Debug, Clone)]
pub struct HomeSettings {
    /// Interval between `ot-ctl state` probes.
    pub role_poll_interval: Duration,
    /// Interval between device log fetches while waiting for output.
    pub output_poll_interval: Duration,
    /// Mesh reset behaviour.
    pub reset: ResetPolicy,
}

impl Default for HomeSettings {
    fn default() -> Self {
        Self {
            role_poll_interval: DEFAULT_POLL_INTERVAL,
            output_poll_interval: Duration::from_secs(1),
            reset: ResetPolicy::default(),
        }
    }
}

/// One home on a fleet backend.
pub struct VirtualHome<B: HomeBackend> {
    backend: B,
    settings: HomeSettings,
    home: Option<HomeId>,
    devices: HomeDevices,
}

impl<B: HomeBackend> VirtualHome<B> {
    /// Create a session. No home exists until [`initialize_home`](Self::initialize_home).
    pub fn new(backend: B, settings: HomeSettings) -> Self {
        Self {
            backend,
            settings,
            home: None,
            devices: HomeDevices::default(),
        }
    }

    /// The backend this session runs on.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Session settings.
    pub fn settings(&self) -> &HomeSettings {
        &self.settings
    }

    /// Id of the current home, if one was created.
    pub fn home_id(&self) -> Option<&HomeId> {
        self.home.as_ref()
    }

    /// Non-access-point devices of the current home.
    pub fn devices(&self) -> &HomeDevices {
        &self.devices
    }

    fn home(&self) -> Result<&HomeId, BackendError> {
        self.home.as_ref().ok_or(BackendError::NoHome)
    }

    fn label(&self, device: &DeviceId) -> String {
        self.devices
            .get(device)
            .map(DeviceDescriptor::pretty_id)
            .unwrap_or_else(|| format!("{}...", device.short()))
    }

    /// Create a home from `config` and check the fleet realized it as configured.
    ///
    /// The home id is kept even when a check fails, so the home can still be torn down.
    pub async fn initialize_home(&mut self, config: &DeviceConfig) -> Result<HomeId, ScenarioError> {
        config.validate()?;

        let home = self.backend.create_home(config).await?;
        tracing::info!("Created home {} with {} devices", home, config.len());
        self.home = Some(home.clone());

        let homes = self.backend.list_homes().await?;
        if !homes.contains(&home) {
            return Err(ScenarioError::Provisioning(format!(
                "home {} is not listed by the fleet",
                home
            )));
        }

        let descriptors = self.backend.home_devices(&home).await?;
        self.devices = HomeDevices::from_descriptors(descriptors);

        let created = self.devices.role_types();
        let configured = config.role_types();
        if created != configured {
            return Err(ScenarioError::Provisioning(format!(
                "created device types {:?} do not match configured {:?}",
                created, configured
            )));
        }

        for device in self.devices.iter() {
            tracing::info!(
                "{} at {}",
                device.pretty_id(),
                device.description.ipv4_addr.as_deref().unwrap_or("-")
            );
        }
        Ok(home)
    }

    /// Run a shell command on a device.
    pub async fn execute_device_cmd(
        &self,
        device: &DeviceId,
        command: &str,
    ) -> Result<ExecutionResult, BackendError> {
        let home = self.home()?;
        let label = self.label(device);
        tracing::info!("{}: executing {}", label, command);

        let result = self.backend.device_cmd(home, device, command).await?;

        tracing::info!("{}: return code {}", label, result.return_code);
        tracing::debug!("{}: output\n{}", label, result.output);
        Ok(result)
    }

    /// Full console log of a device.
    pub async fn device_log(&self, device: &DeviceId) -> Result<Vec<u8>, BackendError> {
        let home = self.home()?;
        self.backend.device_log(home, device).await
    }

    /// Wait until the device log contains `marker`.
    ///
    /// Checks at least once. Returns `false` when the marker has not appeared by the
    /// deadline.
    pub async fn wait_for_device_output(
        &self,
        device: &DeviceId,
        marker: &str,
        timeout: Duration,
    ) -> Result<bool, BackendError> {
        let label = self.label(device);
        tracing::info!("Waiting for {:?} on {} (timeout {:?})", marker, label, timeout);

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let log = self.device_log(device).await?;
            if String::from_utf8_lossy(&log).contains(marker) {
                tracing::info!("{}: found {:?}", label, marker);
                return Ok(true);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::warn!("{}: {:?} not seen within {:?}", label, marker, timeout);
                return Ok(false);
            }
            tokio::time::sleep(self.settings.output_poll_interval.min(deadline - now)).await;
        }
    }

    async fn require_output(
        &self,
        device: &DeviceId,
        marker: &str,
        timeout: Duration,
    ) -> Result<(), ScenarioError> {
        if self.wait_for_device_output(device, marker, timeout).await? {
            Ok(())
        } else {
            Err(ScenarioError::DeviceNotReady {
                device: self.label(device),
                marker: marker.to_string(),
                timeout,
            })
        }
    }

    /// Current mesh role of a device.
    pub async fn thread_role(&self, device: &DeviceId) -> Result<ThreadRole, BackendError> {
        let result = self.execute_device_cmd(device, STATE_COMMAND).await?;
        Ok(ThreadRole::from_state_output(&result.output))
    }

    /// Poll a device until it reports a role `expectation` accepts.
    pub async fn check_device_thread_state(
        &self,
        device: &DeviceId,
        expectation: &RoleExpectation,
    ) -> Result<ThreadRole, PollError> {
        let label = self.label(device);
        poller::wait_for_role(
            self,
            device,
            &label,
            expectation,
            self.settings.role_poll_interval,
        )
        .await
    }

    /// Factory-reset the mesh stack of each device and wait for it to come back disabled.
    ///
    /// Both readiness markers must appear before the reset is issued, and the device must
    /// report `disabled` afterwards.
    pub async fn reset_thread_devices(&self, devices: &[DeviceId]) -> Result<(), ScenarioError> {
        let policy = &self.settings.reset;
        for device in devices {
            self.require_output(device, &policy.agent_marker, policy.agent_timeout)
                .await?;
            self.require_output(device, &policy.server_marker, policy.server_timeout)
                .await?;

            self.execute_device_cmd(device, FACTORY_RESET_COMMAND).await?;

            let expectation = RoleExpectation::one(ThreadRole::Disabled, policy.disabled_timeout);
            self.check_device_thread_state(device, &expectation)
                .await
                .map_err(|e| ScenarioError::from_poll(e, ScenarioError::MeshReset))?;
        }
        Ok(())
    }

    /// Write each device's console log to `dir` as `<type>-<unix-ts>-<short id>.log`.
    pub async fn save_device_logs(&self, dir: &Path) -> Result<Vec<PathBuf>, ScenarioError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ScenarioError::LogArchive {
                path: dir.to_path_buf(),
                source,
            })?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut written = Vec::with_capacity(self.devices.len());
        for device in self.devices.iter() {
            let log = self.device_log(&device.id).await?;
            let path = dir.join(format!(
                "{}-{}-{}.log",
                device.role_type.wire_name(),
                timestamp,
                device.id.short()
            ));
            tokio::fs::write(&path, &log)
                .await
                .map_err(|source| ScenarioError::LogArchive {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!("Saved {} log to {}", device.pretty_id(), path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Tear the current home down. Does nothing when no home exists.
    pub async fn destroy_home(&mut self) -> Result<(), BackendError> {
        if let Some(home) = self.home.take() {
            tracing::info!("Destroying home {}", home);
            self.backend.destroy_home(&home).await?;
            self.devices = HomeDevices::default();
        }
        Ok(())
    }
}

#[async_trait]
impl<B: HomeBackend> RoleProbe for VirtualHome<B> {
    async fn thread_role(&self, device: &DeviceId) -> Result<ThreadRole, BackendError> {
        VirtualHome::thread_role(self, device).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockHome;
    use mesh_types::{Capability, DeviceSpec, RoleType};

    fn config() -> DeviceConfig {
        DeviceConfig::new()
            .with_device(
                "device0",
                DeviceSpec::new(RoleType::Controller, "chip_mobile_device")
                    .capability(Capability::Interactive),
            )
            .with_device(
                "device1",
                DeviceSpec::new(RoleType::EndDevice, "chip_server")
                    .capability(Capability::Thread)
                    .capability(Capability::Interactive),
            )
    }

    fn ready_log() -> &'static str {
        "boot\nBorder router agent started.\n[SVR] Server Listening...\n"
    }

    async fn initialized(mock: &MockHome) -> VirtualHome<MockHome> {
        let mut home = VirtualHome::new(mock.clone(), HomeSettings::default());
        home.initialize_home(&config()).await.unwrap();
        home
    }

    #[tokio::test]
    async fn initialize_home_lists_devices_without_access_points() {
        let mock = MockHome::new();
        mock.add_extra_device(MockHome::access_point("ap-0001"));
        let home = initialized(&mock).await;

        assert_eq!(home.devices().len(), 2);
        assert!(home.home_id().is_some());
        assert_eq!(mock.created_configs(), vec![config()]);
    }

    #[tokio::test]
    async fn initialize_home_rejects_invalid_topology_before_creating() {
        let mock = MockHome::new();
        let mut home = VirtualHome::new(mock.clone(), HomeSettings::default());
        let no_controller = DeviceConfig::new().with_device(
            "device1",
            DeviceSpec::new(RoleType::EndDevice, "chip_server"),
        );

        let err = home.initialize_home(&no_controller).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Topology(_)));
        assert!(mock.created_configs().is_empty());
    }

    #[tokio::test]
    async fn initialize_home_requires_home_listed() {
        let mock = MockHome::new();
        mock.hide_homes();
        let mut home = VirtualHome::new(mock.clone(), HomeSettings::default());

        let err = home.initialize_home(&config()).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Provisioning(_)));
        // still torn down afterwards
        home.destroy_home().await.unwrap();
        assert_eq!(mock.destroyed_homes().len(), 1);
    }

    #[tokio::test]
    async fn initialize_home_detects_missing_device_type() {
        let mock = MockHome::new();
        mock.omit_device("device1");
        let mut home = VirtualHome::new(mock.clone(), HomeSettings::default());

        let err = home.initialize_home(&config()).await.unwrap_err();
        assert!(err.to_string().contains("do not match configured"));
    }

    #[tokio::test]
    async fn commands_need_a_home() {
        let home = VirtualHome::new(MockHome::new(), HomeSettings::default());
        assert!(matches!(
            home.execute_device_cmd(&MockHome::device_id("device0"), "ls").await,
            Err(BackendError::NoHome)
        ));
    }

    #[tokio::test]
    async fn thread_role_parses_state_output() {
        let mock = MockHome::new();
        let home = initialized(&mock).await;
        let dev = MockHome::device_id("device1");
        mock.script_roles(&dev, &["router"]);

        assert_eq!(home.thread_role(&dev).await.unwrap(), ThreadRole::Router);
        assert_eq!(mock.commands_for(&dev), vec!["ot-ctl state"]);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_device_output_polls_log() {
        let mock = MockHome::new();
        let home = initialized(&mock).await;
        let dev = MockHome::device_id("device1");
        mock.set_log(&dev, "booting\n");

        let start = tokio::time::Instant::now();
        let found = home
            .wait_for_device_output(&dev, "Server Listening", Duration::from_secs(3))
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        mock.append_log(&dev, "[SVR] Server Listening...\n");
        assert!(home
            .wait_for_device_output(&dev, "Server Listening", Duration::from_secs(3))
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_thread_devices_factory_resets_each_device() {
        let mock = MockHome::new();
        let home = initialized(&mock).await;
        let dev = MockHome::device_id("device1");
        mock.set_log(&dev, ready_log());
        mock.script_roles(&dev, &["leader", "disabled"]);

        home.reset_thread_devices(&[dev.clone()]).await.unwrap();

        assert_eq!(
            mock.commands_for(&dev),
            vec!["ot-ctl factoryreset", "ot-ctl state", "ot-ctl state"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_fails_when_device_never_disables() {
        let mock = MockHome::new();
        let home = initialized(&mock).await;
        let dev = MockHome::device_id("device1");
        mock.set_log(&dev, ready_log());
        mock.script_roles(&dev, &["leader"]);

        let err = home.reset_thread_devices(&[dev]).await.unwrap_err();
        assert!(matches!(err, ScenarioError::MeshReset(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_requires_readiness_markers() {
        let mock = MockHome::new();
        let home = initialized(&mock).await;
        let dev = MockHome::device_id("device1");
        mock.set_log(&dev, "server crashed during boot\n");

        let err = home.reset_thread_devices(&[dev.clone()]).await.unwrap_err();

        match err {
            ScenarioError::DeviceNotReady { marker, timeout, .. } => {
                assert_eq!(marker, "Border router agent started.");
                assert_eq!(timeout, Duration::from_secs(10));
            }
            other => panic!("expected device not ready, got {:?}", other),
        }
        assert!(mock.commands_for(&dev).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_requires_server_marker() {
        let mock = MockHome::new();
        let home = initialized(&mock).await;
        let dev = MockHome::device_id("device1");
        mock.set_log(&dev, "Border router agent started.\n");

        let err = home.reset_thread_devices(&[dev.clone()]).await.unwrap_err();

        assert!(err.to_string().contains("[SVR] Server Listening..."));
        assert!(!mock
            .commands_for(&dev)
            .iter()
            .any(|c| c == "ot-ctl factoryreset"));
    }

    #[tokio::test]
    async fn save_device_logs_writes_one_file_per_device() {
        let mock = MockHome::new();
        let home = initialized(&mock).await;
        mock.set_log(&MockHome::device_id("device1"), "server log");
        let dir = tempfile::tempdir().unwrap();

        let written = home.save_device_logs(dir.path()).await.unwrap();

        assert_eq!(written.len(), 2);
        let server = written
            .iter()
            .find(|p| {
                let name = p.file_name().unwrap().to_string_lossy().into_owned();
                name.starts_with("CHIPEndDevice-") && name.ends_with("-mock-dev.log")
            })
            .expect("end device log");
        assert_eq!(std::fs::read_to_string(server).unwrap(), "server log");
    }

    #[tokio::test]
    async fn destroy_home_is_idempotent() {
        let mock = MockHome::new();
        let mut home = initialized(&mock).await;
        home.destroy_home().await.unwrap();
        home.destroy_home().await.unwrap();
        assert_eq!(mock.destroyed_homes().len(), 1);
        assert!(home.home_id().is_none());
    }
}
