//! Basic cluster attribute reads over a two-device home.

use mesh_types::{
    Capability, DeviceConfig, DeviceSpec, ExpectedAttributeReport, RoleExpectation, RoleType,
    ThreadRole,
};
use std::time::Duration;

use super::Scenario;
use crate::invoker::RemoteTest;

const BASIC_CLUSTER: u16 = 0x0028;

const TYPE_CHAR_STRING: u8 = 0x42;
const TYPE_INT16U: u8 = 0x21;
const TYPE_INT32U: u8 = 0x23;

pub(super) fn scenario() -> Scenario {
    Scenario {
        name: "basic-cluster-attrs",
        description: "Read every Basic cluster attribute of an end-device from the controller",
        topology: topology(),
        formation: None,
        test: RemoteTest::python("/usr/bin/basic-cluster-attributes-test.py", 75),
        final_roles: RoleExpectation::one(ThreadRole::Leader, Duration::from_secs(2)),
        expected_reports: expected_reports(),
    }
}

fn topology() -> DeviceConfig {
    DeviceConfig::new()
        .with_device(
            "device0",
            DeviceSpec::new(RoleType::Controller, "chip_mobile_device")
                .capability(Capability::Interactive)
                .rcp_mode(true),
        )
        .with_device(
            "device1",
            DeviceSpec::new(RoleType::EndDevice, "chip_server")
                .capability(Capability::Thread)
                .capability(Capability::Interactive)
                .rcp_mode(true),
        )
}

fn expected_reports() -> Vec<ExpectedAttributeReport> {
    [
        // VendorName
        (0x0001, TYPE_CHAR_STRING, "TEST_VENDOR"),
        // VendorID
        (0x0002, TYPE_INT16U, "0x235a"),
        // ProductName
        (0x0003, TYPE_CHAR_STRING, "TEST_PRODUCT"),
        // ProductID
        (0x0004, TYPE_INT16U, "0xfeff"),
        // UserLabel
        (0x0005, TYPE_CHAR_STRING, ""),
        // Location
        (0x0006, TYPE_CHAR_STRING, ""),
        // HardwareVersion
        (0x0007, TYPE_INT16U, "0x0001"),
        // HardwareVersionString
        (0x0008, TYPE_CHAR_STRING, "TEST_VERSION"),
        // SoftwareVersion
        (0x0009, TYPE_INT32U, "0x00000001"),
        // SoftwareVersionString
        (0x000a, TYPE_CHAR_STRING, "prerelease"),
    ]
    .into_iter()
    .map(|(attribute, attribute_type, value)| {
        ExpectedAttributeReport::new(BASIC_CLUSTER, attribute, attribute_type, value)
    })
    .collect()
}
