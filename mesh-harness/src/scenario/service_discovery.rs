//! Operational discovery over SRP through a border router.

use mesh_types::{Capability, DeviceConfig, DeviceSpec, RoleExpectation, RoleType, ThreadRole};
use std::time::Duration;

use super::Scenario;
use crate::formation::FormationPlan;
use crate::invoker::RemoteTest;

pub(super) fn scenario() -> Scenario {
    Scenario {
        name: "service-discovery",
        description: "Form a network on a border router and discover the end-device over SRP",
        topology: topology(),
        formation: Some(FormationPlan::default()),
        test: RemoteTest::python("/usr/bin/operational-discovery-srp-test.py", 75),
        final_roles: RoleExpectation::any_of(
            [ThreadRole::Child, ThreadRole::Router],
            Duration::from_secs(2),
        ),
        expected_reports: Vec::new(),
    }
}

fn topology() -> DeviceConfig {
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
                .capability(Capability::Interactive)
                .rcp_mode(true),
        )
        .with_device(
            "device2",
            DeviceSpec::new(RoleType::BorderRouter, "border_router")
                .capability(Capability::Thread)
                .capability(Capability::Interactive)
                .rcp_mode(true),
        )
}
