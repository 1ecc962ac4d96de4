//! Thread network formation.

use mesh_types::{Capability, DeviceDescriptor, RoleExpectation, ThreadDataset, ThreadRole};
use std::time::Duration;

use crate::backend::HomeBackend;
use crate::error::ScenarioError;
use crate::home::VirtualHome;

/// How a scenario forms its network.
#[derive(Debug, Clone)]
pub struct FormationPlan {
    /// Log line the forming device prints once it can accept the dataset.
    pub ready_marker: String,
    /// How long to wait for `ready_marker`.
    pub ready_timeout: Duration,
    /// Role the forming device must reach.
    pub expected_role: ThreadRole,
    /// How long the forming device may take to reach `expected_role`.
    pub timeout: Duration,
    /// Dataset committed as the active dataset.
    pub dataset: ThreadDataset,
}

impl Default for FormationPlan {
    fn default() -> Self {
        Self {
            ready_marker: "Border router agent started.".into(),
            ready_timeout: Duration::from_secs(30),
            expected_role: ThreadRole::Leader,
            timeout: Duration::from_secs(15),
            dataset: ThreadDataset::default(),
        }
    }
}

/// Commands that commit `dataset_hex` and restart the Thread interface.
pub fn formation_commands(dataset_hex: &str) -> Vec<String> {
    vec![
        "ot-ctl thread stop".into(),
        "ot-ctl ifconfig down".into(),
        format!("ot-ctl dataset set active {}", dataset_hex),
        "ot-ctl ifconfig up".into(),
        "ot-ctl thread start".into(),
        "ot-ctl dataset active".into(),
    ]
}

/// Form a network on `device` and wait until it reaches the plan's role.
///
/// Makes one attempt. Devices without a Thread radio are refused before any command is
/// sent.
pub async fn form_network<B: HomeBackend>(
    home: &VirtualHome<B>,
    device: &DeviceDescriptor,
    plan: &FormationPlan,
) -> Result<ThreadRole, ScenarioError> {
    if !device.has_capability(Capability::Thread) {
        return Err(ScenarioError::FormationRefused {
            device: device.pretty_id(),
        });
    }

    let dataset_hex = plan.dataset.to_tlv_hex()?;
    tracing::info!(
        "Forming network {:?} on {}",
        plan.dataset.network_name,
        device.pretty_id()
    );
    for command in formation_commands(&dataset_hex) {
        let result = home.execute_device_cmd(&device.id, &command).await?;
        if !result.return_code.is_zero() {
            tracing::warn!(
                "{}: {:?} returned {}: {}",
                device.pretty_id(),
                command,
                result.return_code,
                result.output_tail(5)
            );
        }
    }

    let expectation = RoleExpectation::one(plan.expected_role.clone(), plan.timeout);
    home.check_device_thread_state(&device.id, &expectation)
        .await
        .map_err(|e| ScenarioError::from_poll(e, ScenarioError::FormationTimeout))
}
