//! Declarative topology and the device descriptors the fleet service reports back.
//!
//! Wire names follow the fleet service: a controller is a `MobileDevice`, an end-device
//! is a `CHIPEndDevice`, and so on. The same [`DeviceConfig`] value is both the scenario's
//! topology and the JSON body posted to create a home.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{LookupError, MeshError};
use crate::ids::DeviceId;

/// Kind of device in a virtual home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleType {
    /// Controller ("mobile") device that runs the test binaries.
    #[serde(rename = "MobileDevice")]
    Controller,
    /// Protocol end-device under test.
    #[serde(rename = "CHIPEndDevice")]
    EndDevice,
    /// Thread border router.
    #[serde(rename = "Border-Router")]
    BorderRouter,
    /// WiFi access point created by the fleet service; never addressed by scenarios.
    #[serde(rename = "wifi_ap")]
    AccessPoint,
}

impl RoleType {
    /// Name used on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            RoleType::Controller => "MobileDevice",
            RoleType::EndDevice => "CHIPEndDevice",
            RoleType::BorderRouter => "Border-Router",
            RoleType::AccessPoint => "wifi_ap",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Capability a virtual device is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Thread radio (simulated RCP or NCP).
    Thread,
    /// Accepts remote commands.
    Interactive,
    /// WiFi interface.
    WiFi,
    /// Weave daemon.
    Weave,
    /// Host directory mounts.
    Mount,
    /// `tc` traffic shaping.
    TrafficControl,
    /// Access to the host LAN.
    LanAccess,
    /// Virtual display.
    Xvnc,
}

/// Set of capabilities.
///
/// Serialized as a list. The fleet service reports capabilities as a map keyed by
/// capability name, so deserialization accepts either shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability.
    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    /// Check membership.
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Iterate in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for CapabilitySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<Capability>),
            Map(BTreeMap<Capability, serde_json::Value>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::List(list) => list.into_iter().collect(),
            Repr::Map(map) => map.into_keys().collect(),
        })
    }
}

/// Declarative description of one device in a topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    /// Kind of device.
    #[serde(rename = "type")]
    pub role_type: RoleType,
    /// Container image the device boots from.
    pub base_image: String,
    /// Capabilities the device is created with.
    #[serde(rename = "capability", default)]
    pub capabilities: CapabilitySet,
    /// Run the Thread radio as a simulated RCP.
    #[serde(default)]
    pub rcp_mode: bool,
}

impl DeviceSpec {
    /// Create a spec with no capabilities and RCP mode off.
    pub fn new(role_type: RoleType, base_image: &str) -> Self {
        Self {
            role_type,
            base_image: base_image.into(),
            capabilities: CapabilitySet::new(),
            rcp_mode: false,
        }
    }

    /// Add a capability.
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Set RCP mode.
    pub fn rcp_mode(mut self, enabled: bool) -> Self {
        self.rcp_mode = enabled;
        self
    }
}

/// A full topology: logical device name to spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceConfig(BTreeMap<String, DeviceSpec>);

impl DeviceConfig {
    /// Empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named device.
    pub fn with_device(mut self, name: &str, spec: DeviceSpec) -> Self {
        self.0.insert(name.into(), spec);
        self
    }

    /// Look up a device by logical name.
    pub fn get(&self, name: &str) -> Option<&DeviceSpec> {
        self.0.get(name)
    }

    /// Iterate `(name, spec)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no devices are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct role types present.
    pub fn role_types(&self) -> BTreeSet<RoleType> {
        self.0.values().map(|spec| spec.role_type).collect()
    }

    /// Check the topology invariants: exactly one controller and non-empty images.
    pub fn validate(&self) -> Result<(), MeshError> {
        let controllers = self
            .0
            .values()
            .filter(|spec| spec.role_type == RoleType::Controller)
            .count();
        if controllers != 1 {
            return Err(MeshError::InvalidTopology(format!(
                "expected exactly one {} device, found {}",
                RoleType::Controller,
                controllers
            )));
        }

        if let Some((name, _)) = self.iter().find(|(_, spec)| spec.base_image.is_empty()) {
            return Err(MeshError::InvalidTopology(format!(
                "device {} has an empty base image",
                name
            )));
        }

        Ok(())
    }
}

/// Network fields of a created device.
///
/// Only `ipv4_addr` is interpreted; everything else the fleet reports is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// IPv4 address on the home's Ethernet segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_addr: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A device as reported by the fleet service after a home is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Runtime handle.
    pub id: DeviceId,
    /// Kind of device.
    #[serde(rename = "type")]
    pub role_type: RoleType,
    /// Image the device was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,
    /// Capabilities the device was created with.
    #[serde(rename = "capability", default)]
    pub capabilities: CapabilitySet,
    /// Network fields.
    #[serde(default)]
    pub description: DeviceDescription,
}

impl DeviceDescriptor {
    /// True when the device was created with the capability.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Parsed IPv4 address.
    pub fn ipv4_addr(&self) -> Result<Ipv4Addr, MeshError> {
        self.description
            .ipv4_addr
            .as_deref()
            .and_then(|addr| addr.trim().parse().ok())
            .ok_or_else(|| MeshError::MissingAddress {
                device: self.pretty_id(),
            })
    }

    /// `<type>(<short id>...)`, used in log lines.
    pub fn pretty_id(&self) -> String {
        format!("{}({}...)", self.role_type, self.id.short())
    }
}

/// Non-access-point devices of a home, with typed role lookup.
#[derive(Debug, Clone, Default)]
pub struct HomeDevices {
    devices: Vec<DeviceDescriptor>,
}

impl HomeDevices {
    /// Build from the fleet's descriptor list, dropping access points.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = DeviceDescriptor>) -> Self {
        Self {
            devices: descriptors
                .into_iter()
                .filter(|d| d.role_type != RoleType::AccessPoint)
                .collect(),
        }
    }

    /// The unique device with a role.
    pub fn single(&self, role: RoleType) -> Result<&DeviceDescriptor, LookupError> {
        let mut matches = self.all(role);
        let first = matches.next().ok_or(LookupError::NotFound(role))?;
        let rest = matches.count();
        if rest > 0 {
            return Err(LookupError::Ambiguous {
                role,
                count: rest + 1,
            });
        }
        Ok(first)
    }

    /// All devices with a role, in fleet order.
    pub fn all(&self, role: RoleType) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter().filter(move |d| d.role_type == role)
    }

    /// Find a device by id.
    pub fn get(&self, id: &DeviceId) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| &d.id == id)
    }

    /// Iterate over every device.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True when the home has no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Distinct role types present.
    pub fn role_types(&self) -> BTreeSet<RoleType> {
        self.devices.iter().map(|d| d.role_type).collect()
    }
}
