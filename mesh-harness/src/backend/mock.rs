//! Mock fleet for testing.
//!
//! Creates homes in memory, answers `ot-ctl state` from a per-device role script, serves
//! canned logs and records every command it runs.

use super::{BackendError, HomeBackend};
use async_trait::async_trait;
use mesh_types::{
    CapabilitySet, DeviceConfig, DeviceDescription, DeviceDescriptor, DeviceId, ExecutionResult,
    HomeId, RoleType,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

const STATE_COMMAND: &str = "ot-ctl state";

/// Mock fleet for testing.
///
/// Device ids are predictable (`mock-<logical name>`), so roles, logs and responses can be
/// scripted before the home exists.
#[derive(Debug, Default)]
pub struct MockHome {
    inner: Arc<Mutex<MockHomeInner>>,
}

#[derive(Debug, Default)]
struct MockHomeInner {
    next_home: u32,
    homes: HashMap<HomeId, Vec<DeviceDescriptor>>,
    destroyed: Vec<HomeId>,
    created_configs: Vec<DeviceConfig>,
    roles: HashMap<DeviceId, VecDeque<String>>,
    logs: HashMap<DeviceId, String>,
    responses: Vec<(DeviceId, String, ExecutionResult)>,
    commands: Vec<(DeviceId, String)>,
    extra_devices: Vec<DeviceDescriptor>,
    omitted: HashSet<String>,
    hide_homes: bool,
    fail_next_create: Option<String>,
    fail_next_command: Option<String>,
}

impl MockHome {
    /// Create a new mock fleet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the mock assigns to the device with this logical name.
    pub fn device_id(name: &str) -> DeviceId {
        DeviceId::new(format!("mock-{}", name))
    }

    /// Access point descriptor, as Cirque adds one to homes with WiFi devices.
    pub fn access_point(id: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: DeviceId::new(id),
            role_type: RoleType::AccessPoint,
            base_image: Some("mac80211_ap_image".into()),
            capabilities: CapabilitySet::new(),
            description: DeviceDescription::default(),
        }
    }

    /// Script the successive outputs of `ot-ctl state` on a device.
    ///
    /// Each call consumes one entry; the last entry repeats forever. Devices without a
    /// script report `disabled`.
    pub fn script_roles(&self, device: &DeviceId, roles: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .roles
            .insert(device.clone(), roles.iter().map(|r| r.to_string()).collect());
    }

    /// Replace a device's console log.
    pub fn set_log(&self, device: &DeviceId, log: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.logs.insert(device.clone(), log.to_string());
    }

    /// Append to a device's console log.
    pub fn append_log(&self, device: &DeviceId, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.logs.entry(device.clone()).or_default().push_str(text);
    }

    /// Answer commands on `device` that start with `prefix`.
    ///
    /// Later registrations win over earlier ones. Unmatched commands return `"0"` and
    /// `Done`.
    pub fn respond(&self, device: &DeviceId, prefix: &str, result: ExecutionResult) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .responses
            .push((device.clone(), prefix.to_string(), result));
    }

    /// Add a device to every home created from now on, regardless of topology.
    pub fn add_extra_device(&self, device: DeviceDescriptor) {
        let mut inner = self.inner.lock().unwrap();
        inner.extra_devices.push(device);
    }

    /// Do not create the device with this logical name.
    pub fn omit_device(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.omitted.insert(name.to_string());
    }

    /// Leave created homes out of `list_homes`.
    pub fn hide_homes(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.hide_homes = true;
    }

    /// Cause the next `create_home` to fail.
    pub fn fail_next_create(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_create = Some(error.to_string());
    }

    /// Cause the next `device_cmd` to fail.
    pub fn fail_next_command(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_command = Some(error.to_string());
    }

    /// Every command run, in order.
    pub fn commands(&self) -> Vec<(DeviceId, String)> {
        let inner = self.inner.lock().unwrap();
        inner.commands.clone()
    }

    /// Commands run on one device, in order.
    pub fn commands_for(&self, device: &DeviceId) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .commands
            .iter()
            .filter(|(id, _)| id == device)
            .map(|(_, cmd)| cmd.clone())
            .collect()
    }

    /// Topologies passed to `create_home`.
    pub fn created_configs(&self) -> Vec<DeviceConfig> {
        let inner = self.inner.lock().unwrap();
        inner.created_configs.clone()
    }

    /// Homes that were destroyed.
    pub fn destroyed_homes(&self) -> Vec<HomeId> {
        let inner = self.inner.lock().unwrap();
        inner.destroyed.clone()
    }
}

impl Clone for MockHome {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockHomeInner {
    fn check_home(&self, home: &HomeId) -> Result<&Vec<DeviceDescriptor>, BackendError> {
        self.homes
            .get(home)
            .ok_or_else(|| BackendError::UnknownHome(home.clone()))
    }

    fn check_device(&self, home: &HomeId, device: &DeviceId) -> Result<(), BackendError> {
        if self.check_home(home)?.iter().any(|d| &d.id == device) {
            Ok(())
        } else {
            Err(BackendError::UnknownDevice(device.clone()))
        }
    }

    fn next_role(&mut self, device: &DeviceId) -> String {
        match self.roles.get_mut(device) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or_default(),
            Some(script) => script.front().cloned().unwrap_or_default(),
            None => "disabled".into(),
        }
    }
}

#[async_trait]
impl HomeBackend for MockHome {
    async fn create_home(&self, config: &DeviceConfig) -> Result<HomeId, BackendError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_create.take() {
            return Err(BackendError::Injected(error));
        }

        inner.next_home += 1;
        let home = HomeId::new(format!("mock-home-{}", inner.next_home));

        let mut devices: Vec<DeviceDescriptor> = config
            .iter()
            .filter(|(name, _)| !inner.omitted.contains(*name))
            .enumerate()
            .map(|(i, (name, spec))| DeviceDescriptor {
                id: Self::device_id(name),
                role_type: spec.role_type,
                base_image: Some(spec.base_image.clone()),
                capabilities: spec.capabilities.clone(),
                description: DeviceDescription {
                    ipv4_addr: Some(format!("192.168.4.{}", i + 2)),
                    ..DeviceDescription::default()
                },
            })
            .collect();
        devices.extend(inner.extra_devices.iter().cloned());

        inner.created_configs.push(config.clone());
        inner.homes.insert(home.clone(), devices);
        Ok(home)
    }

    async fn list_homes(&self) -> Result<Vec<HomeId>, BackendError> {
        let inner = self.inner.lock().unwrap();
        if inner.hide_homes {
            return Ok(Vec::new());
        }
        Ok(inner.homes.keys().cloned().collect())
    }

    async fn home_devices(&self, home: &HomeId) -> Result<Vec<DeviceDescriptor>, BackendError> {
        let inner = self.inner.lock().unwrap();
        inner.check_home(home).cloned()
    }

    async fn device_cmd(
        &self,
        home: &HomeId,
        device: &DeviceId,
        command: &str,
    ) -> Result<ExecutionResult, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_device(home, device)?;
        inner.commands.push((device.clone(), command.to_string()));

        if let Some(error) = inner.fail_next_command.take() {
            return Err(BackendError::Injected(error));
        }

        if command == STATE_COMMAND {
            let role = inner.next_role(device);
            return Ok(ExecutionResult::new("0", &format!("{}\nDone\n", role)));
        }

        let scripted = inner
            .responses
            .iter()
            .rev()
            .find(|(id, prefix, _)| id == device && command.starts_with(prefix.as_str()))
            .map(|(_, _, result)| result.clone());
        Ok(scripted.unwrap_or_else(|| ExecutionResult::new("0", "Done\n")))
    }

    async fn device_log(&self, home: &HomeId, device: &DeviceId) -> Result<Vec<u8>, BackendError> {
        let inner = self.inner.lock().unwrap();
        inner.check_device(home, device)?;
        Ok(inner
            .logs
            .get(device)
            .map(|log| log.as_bytes().to_vec())
            .unwrap_or_default())
    }

    async fn destroy_home(&self, home: &HomeId) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .homes
            .remove(home)
            .ok_or_else(|| BackendError::UnknownHome(home.clone()))?;
        inner.destroyed.push(home.clone());
        Ok(())
    }
}
