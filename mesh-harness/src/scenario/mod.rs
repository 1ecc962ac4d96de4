//! Scenarios and the built-in catalog.
//!
//! A [`Scenario`] is pure data: the topology to create, an optional formation plan, the
//! remote test to run, the roles end-devices must settle in afterwards and the attribute
//! reports the test must print. [`ScenarioDriver`] executes one.

mod basic_cluster;
mod driver;
mod service_discovery;

pub use driver::{ScenarioDriver, ScenarioState};

use mesh_types::{DeviceConfig, ExpectedAttributeReport, RoleExpectation};

use crate::formation::FormationPlan;
use crate::invoker::RemoteTest;

/// One end-to-end test case.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Catalog name.
    pub name: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Devices to create.
    pub topology: DeviceConfig,
    /// Network formation, if the scenario forms its own network.
    pub formation: Option<FormationPlan>,
    /// Test run on the controller.
    pub test: RemoteTest,
    /// Roles every end-device must reach after the test.
    pub final_roles: RoleExpectation,
    /// Reports the test output must contain.
    pub expected_reports: Vec<ExpectedAttributeReport>,
}

/// Every built-in scenario.
pub fn catalog() -> Vec<Scenario> {
    vec![basic_cluster::scenario(), service_discovery::scenario()]
}

/// Look a built-in scenario up by name.
pub fn find(name: &str) -> Option<Scenario> {
    catalog().into_iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{Capability, RoleType, ThreadRole};
    use std::time::Duration;

    #[test]
    fn catalog_topologies_are_valid() {
        for scenario in catalog() {
            scenario.topology.validate().unwrap();
            assert!(scenario.topology.role_types().contains(&RoleType::EndDevice));
        }
    }

    #[test]
    fn find_by_name() {
        assert!(find("basic-cluster-attrs").is_some());
        assert!(find("service-discovery").is_some());
        assert!(find("nope").is_none());
    }

    #[test]
    fn basic_cluster_table() {
        let scenario = find("basic-cluster-attrs").unwrap();
        assert!(scenario.formation.is_none());
        assert_eq!(scenario.expected_reports.len(), 10);
        assert!(scenario
            .expected_reports
            .iter()
            .all(|r| r.cluster_id.0 == 0x0028));
        assert_eq!(
            scenario.final_roles,
            RoleExpectation::one(ThreadRole::Leader, Duration::from_secs(2))
        );
        assert_eq!(scenario.test.timeout_secs, 75);
    }

    #[test]
    fn service_discovery_forms_on_thread_border_router() {
        let scenario = find("service-discovery").unwrap();
        let plan = scenario.formation.as_ref().unwrap();
        assert_eq!(plan.expected_role, ThreadRole::Leader);
        assert_eq!(plan.timeout, Duration::from_secs(15));
        assert_eq!(plan.ready_timeout, Duration::from_secs(30));

        let br = scenario.topology.get("device2").unwrap();
        assert_eq!(br.role_type, RoleType::BorderRouter);
        assert!(br.capabilities.contains(Capability::Thread));
        assert!(!scenario.topology.get("device0").unwrap().rcp_mode);
        assert!(scenario.expected_reports.is_empty());
        assert!(scenario.final_roles.accepts(&ThreadRole::Child));
        assert!(scenario.final_roles.accepts(&ThreadRole::Router));
    }

    #[test]
    fn topology_serializes_as_create_home_body() {
        let scenario = find("basic-cluster-attrs").unwrap();
        let json = serde_json::to_value(&scenario.topology).unwrap();
        assert_eq!(json["device0"]["type"], "MobileDevice");
        assert_eq!(json["device1"]["type"], "CHIPEndDevice");
        assert_eq!(
            json["device1"]["capability"],
            serde_json::json!(["Thread", "Interactive"])
        );
        assert_eq!(json["device1"]["rcp_mode"], true);
    }
}
