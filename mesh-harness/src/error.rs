//! Scenario error taxonomy.
//!
//! Every variant is terminal for the scenario. Collaborator failures
//! ([`ScenarioError::Backend`]) are classified as system failures; everything else is an
//! assertion about the devices under test and counts as a test failure.

use mesh_types::{ExitStatus, LookupError, MeshError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::backend::BackendError;
use crate::poller::{PollError, RoleTimeout};
use crate::verifier::VerificationFailure;

/// Errors that end a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Topology could not be realized as configured.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Invalid topology, device data or dataset.
    #[error("invalid configuration: {0}")]
    Topology(#[from] MeshError),

    /// A role could not be resolved to a single device.
    #[error("provisioning failed: {0}")]
    Lookup(#[from] LookupError),

    /// A readiness marker never appeared in a device log.
    #[error("{device} not ready: {marker:?} not seen within {timeout:?}")]
    DeviceNotReady {
        /// Device that was watched.
        device: String,
        /// Literal that was expected in the log.
        marker: String,
        /// How long the log was watched.
        timeout: Duration,
    },

    /// A device did not return to `disabled` after a factory reset.
    #[error("mesh reset failed: {0}")]
    MeshReset(RoleTimeout),

    /// Network formation was requested on a device without a Thread radio.
    #[error("cannot form network on {device}: device has no Thread capability")]
    FormationRefused {
        /// Device formation was requested on.
        device: String,
    },

    /// The formed network did not reach the expected role.
    #[error("network formation failed: {0}")]
    FormationTimeout(RoleTimeout),

    /// The remote test exited non-zero or crashed.
    #[error("test invocation failed on {device}: {status}\ncommand: {command}\n{output_tail}")]
    Invocation {
        /// Device the test ran on.
        device: String,
        /// Full command line.
        command: String,
        /// How the process ended.
        status: ExitStatus,
        /// Last lines of combined output.
        output_tail: String,
    },

    /// An expected attribute report is missing from the test output.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationFailure),

    /// An end-device did not settle into an expected role after the test.
    #[error("role convergence failed: {0}")]
    RoleConvergenceTimeout(RoleTimeout),

    /// Device logs could not be written.
    #[error("failed to archive device log to {path}: {source}")]
    LogArchive {
        /// File or directory that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The fleet service or execution transport failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl ScenarioError {
    /// True when the failure came from infrastructure rather than the devices under test.
    pub fn is_system_failure(&self) -> bool {
        matches!(
            self,
            ScenarioError::Backend(_) | ScenarioError::LogArchive { .. }
        )
    }

    /// Map a poll failure, tagging timeouts with the step they belong to.
    pub(crate) fn from_poll(err: PollError, on_timeout: fn(RoleTimeout) -> Self) -> Self {
        match err {
            PollError::Timeout(timeout) => on_timeout(timeout),
            PollError::Backend(e) => ScenarioError::Backend(e),
        }
    }
}

/// Outcome of a complete test run, as reported to the outer runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestResult {
    /// Every step passed.
    Ok = 0,
    /// The devices under test misbehaved.
    TestFailure = 1,
    /// The fleet, transport or log archive failed.
    SystemFailure = 2,
}

impl TestResult {
    /// Classify a scenario outcome.
    pub fn from_outcome(outcome: &Result<(), ScenarioError>) -> Self {
        match outcome {
            Ok(()) => TestResult::Ok,
            Err(e) if e.is_system_failure() => TestResult::SystemFailure,
            Err(_) => TestResult::TestFailure,
        }
    }

    /// Process exit code.
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for TestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TestResult::Ok => "OK",
            TestResult::TestFailure => "TEST_FAILURE",
            TestResult::SystemFailure => "SYSTEM_FAILURE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{RoleType, ThreadRole};

    fn timeout() -> RoleTimeout {
        RoleTimeout {
            device: "CHIPEndDevice(mock-dev...)".into(),
            expected: vec![ThreadRole::Leader],
            observed: vec![ThreadRole::Detached],
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn classification() {
        assert!(ScenarioError::Backend(BackendError::Http("500".into())).is_system_failure());
        assert!(!ScenarioError::RoleConvergenceTimeout(timeout()).is_system_failure());
        assert!(ScenarioError::LogArchive {
            path: PathBuf::from("/logs"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .is_system_failure());
        assert!(!ScenarioError::Lookup(LookupError::NotFound(RoleType::EndDevice))
            .is_system_failure());
    }

    #[test]
    fn poll_errors_map_to_step() {
        let err = ScenarioError::from_poll(
            PollError::Timeout(timeout()),
            ScenarioError::FormationTimeout,
        );
        assert!(matches!(err, ScenarioError::FormationTimeout(_)));
        assert!(err.to_string().starts_with("network formation failed:"));

        let err = ScenarioError::from_poll(
            PollError::Backend(BackendError::Injected("x".into())),
            ScenarioError::FormationTimeout,
        );
        assert!(err.is_system_failure());
    }

    #[test]
    fn invocation_message_carries_status_and_command() {
        let err = ScenarioError::Invocation {
            device: "MobileDevice(mock-dev...)".into(),
            command: "python3 /usr/bin/t.py -t 75 -a 192.168.4.3".into(),
            status: ExitStatus::Exited(1),
            output_tail: "Traceback".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit 1"));
        assert!(msg.contains("-a 192.168.4.3"));
        assert!(msg.ends_with("Traceback"));
    }

    #[test]
    fn test_result_codes() {
        assert_eq!(TestResult::from_outcome(&Ok(())), TestResult::Ok);
        assert_eq!(
            TestResult::from_outcome(&Err(ScenarioError::MeshReset(timeout()))),
            TestResult::TestFailure
        );
        let backend = Err(ScenarioError::Backend(BackendError::NoHome));
        assert_eq!(TestResult::from_outcome(&backend).exit_code(), 2);
        assert!(TestResult::SystemFailure > TestResult::TestFailure);
        assert_eq!(TestResult::TestFailure.to_string(), "TEST_FAILURE");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScenarioError>();
    }
}
