//! Scenario state machine.
//!
//! ```text
//! Init -> Provisioned -> [NetworkFormed] -> Invoked -> Verified -> Done
//!   \__________\_______________\______________\___________\-----> Failed
//! ```
//!
//! Each driver runs its scenario once. Nothing is retried: the first failing step moves
//! the driver to `Failed` and its error is the scenario's error.

use mesh_types::{DeviceDescriptor, DeviceId, LookupError, RoleType};
use std::fmt;
use std::path::Path;

use super::Scenario;
use crate::backend::HomeBackend;
use crate::error::{ScenarioError, TestResult};
use crate::formation;
use crate::home::VirtualHome;
use crate::verifier;

/// Where a scenario run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    /// Nothing done yet.
    Init,
    /// Home created and devices resolved.
    Provisioned,
    /// Network formed on the border router.
    NetworkFormed,
    /// Remote test has run.
    Invoked,
    /// Exit status, roles and reports checked.
    Verified,
    /// Finished successfully.
    Done,
    /// A step failed.
    Failed,
}

impl ScenarioState {
    /// True for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioState::Done | ScenarioState::Failed)
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Devices a scenario addresses, resolved once the home exists.
struct Participants {
    controller: DeviceDescriptor,
    end_devices: Vec<DeviceDescriptor>,
    border_router: Option<DeviceDescriptor>,
}

/// Runs one scenario against one home.
pub struct ScenarioDriver<B: HomeBackend> {
    scenario: Scenario,
    home: VirtualHome<B>,
    state: ScenarioState,
    history: Vec<ScenarioState>,
}

impl<B: HomeBackend> ScenarioDriver<B> {
    /// Create a driver in `Init`.
    pub fn new(scenario: Scenario, home: VirtualHome<B>) -> Self {
        Self {
            scenario,
            home,
            state: ScenarioState::Init,
            history: vec![ScenarioState::Init],
        }
    }

    /// Current state.
    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Every state entered, in order.
    pub fn history(&self) -> &[ScenarioState] {
        &self.history
    }

    /// The home session.
    pub fn home(&self) -> &VirtualHome<B> {
        &self.home
    }

    fn transition(&mut self, next: ScenarioState) {
        tracing::info!(
            "[{}] {} -> {}",
            self.scenario.name,
            self.state,
            next
        );
        self.state = next;
        self.history.push(next);
    }

    /// Run the scenario. The home is left in place; see [`run_test`](Self::run_test).
    pub async fn run(&mut self) -> Result<(), ScenarioError> {
        if self.state != ScenarioState::Init {
            return Err(ScenarioError::Provisioning(format!(
                "scenario {} already ran ({})",
                self.scenario.name, self.state
            )));
        }

        match self.steps().await {
            Ok(()) => {
                self.transition(ScenarioState::Done);
                Ok(())
            }
            Err(e) => {
                tracing::error!("[{}] failed in {}: {}", self.scenario.name, self.state, e);
                self.transition(ScenarioState::Failed);
                Err(e)
            }
        }
    }

    /// Run the scenario, archive device logs into `log_dir`, destroy the home and
    /// classify the outcome.
    ///
    /// Archiving and teardown always happen. A failure in either is a system failure and
    /// outranks a test failure.
    pub async fn run_test(&mut self, log_dir: Option<&Path>) -> TestResult {
        let outcome = self.run().await;
        let mut result = TestResult::from_outcome(&outcome);

        if let (Some(dir), Some(_)) = (log_dir, self.home.home_id()) {
            if let Err(e) = self.home.save_device_logs(dir).await {
                tracing::error!("[{}] {}", self.scenario.name, e);
                result = result.max(TestResult::SystemFailure);
            }
        }

        if let Err(e) = self.home.destroy_home().await {
            tracing::error!("[{}] teardown failed: {}", self.scenario.name, e);
            result = result.max(TestResult::SystemFailure);
        }

        tracing::info!("[{}] result: {}", self.scenario.name, result);
        result
    }

    async fn steps(&mut self) -> Result<(), ScenarioError> {
        self.home.initialize_home(&self.scenario.topology).await?;
        let participants = self.resolve()?;
        let target = participants.end_devices[0].ipv4_addr()?;
        self.transition(ScenarioState::Provisioned);

        let end_device_ids: Vec<DeviceId> = participants
            .end_devices
            .iter()
            .map(|d| d.id.clone())
            .collect();
        self.home.reset_thread_devices(&end_device_ids).await?;

        if let (Some(plan), Some(br)) = (&self.scenario.formation, &participants.border_router) {
            let ready = self
                .home
                .wait_for_device_output(&br.id, &plan.ready_marker, plan.ready_timeout)
                .await?;
            if !ready {
                return Err(ScenarioError::DeviceNotReady {
                    device: br.pretty_id(),
                    marker: plan.ready_marker.clone(),
                    timeout: plan.ready_timeout,
                });
            }
            formation::form_network(&self.home, br, plan).await?;
            self.transition(ScenarioState::NetworkFormed);
        }

        let invocation = self
            .scenario
            .test
            .run(&self.home, &participants.controller.id, target)
            .await?;
        self.transition(ScenarioState::Invoked);

        if !invocation.status.success() {
            return Err(ScenarioError::Invocation {
                device: participants.controller.pretty_id(),
                command: invocation.command.clone(),
                status: invocation.status.clone(),
                output_tail: invocation.output_tail(),
            });
        }

        for device in &participants.end_devices {
            self.home
                .check_device_thread_state(&device.id, &self.scenario.final_roles)
                .await
                .map_err(|e| ScenarioError::from_poll(e, ScenarioError::RoleConvergenceTimeout))?;
        }

        let expected = &self.scenario.expected_reports;
        if let Err(failure) = verifier::verify(&invocation.result.output, expected) {
            for missing in verifier::missing_reports(&invocation.result.output, expected) {
                tracing::warn!(
                    "missing report: cluster {} attribute {}",
                    missing.cluster_id,
                    missing.attribute_id
                );
            }
            return Err(failure.into());
        }
        self.transition(ScenarioState::Verified);
        Ok(())
    }

    fn resolve(&self) -> Result<Participants, ScenarioError> {
        let devices = self.home.devices();
        let controller = devices.single(RoleType::Controller)?.clone();
        let end_devices: Vec<DeviceDescriptor> = devices.all(RoleType::EndDevice).cloned().collect();
        if end_devices.is_empty() {
            return Err(LookupError::NotFound(RoleType::EndDevice).into());
        }
        let border_router = match self.scenario.formation {
            Some(_) => Some(devices.single(RoleType::BorderRouter)?.clone()),
            None => None,
        };
        Ok(Participants {
            controller,
            end_devices,
            border_router,
        })
    }
}
