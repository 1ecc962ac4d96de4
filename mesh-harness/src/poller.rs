//! Role polling.
//!
//! The fleet exposes no notification when a Thread device changes role, so convergence is
//! observed by asking the device for its state at a fixed interval until it reports an
//! accepted role or the deadline passes.

use async_trait::async_trait;
use mesh_types::{DeviceId, RoleExpectation, ThreadRole};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::backend::BackendError;

/// Default interval between role probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Something that can report a device's current mesh role.
#[async_trait]
pub trait RoleProbe: Send + Sync {
    /// Current role of `device`.
    async fn thread_role(&self, device: &DeviceId) -> Result<ThreadRole, BackendError>;
}

/// A role wait that ran out of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTimeout {
    /// Device that was polled.
    pub device: String,
    /// Roles that would have been accepted.
    pub expected: Vec<ThreadRole>,
    /// Distinct roles observed, in order (consecutive repeats collapsed).
    pub observed: Vec<ThreadRole>,
    /// The bound that was exceeded.
    pub timeout: Duration,
}

impl fmt::Display for RoleTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} did not reach [{}] within {:?}; observed [{}]",
            self.device,
            join_roles(&self.expected),
            self.timeout,
            join_roles(&self.observed)
        )
    }
}

fn join_roles(roles: &[ThreadRole]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from a role wait.
#[derive(Debug, Error)]
pub enum PollError {
    /// Expected role not reached in time.
    #[error("{0}")]
    Timeout(RoleTimeout),

    /// Probing the device failed.
    #[error("role probe failed: {0}")]
    Backend(#[from] BackendError),
}

/// Poll `device` until it reports a role `expectation` accepts.
///
/// Probes at least once. Returns the matching role as soon as it is observed; fails once
/// the elapsed time reaches `expectation.timeout`, no matter how many non-matching roles
/// were seen. A failing probe ends the wait immediately.
pub async fn wait_for_role<P: RoleProbe + ?Sized>(
    probe: &P,
    device: &DeviceId,
    label: &str,
    expectation: &RoleExpectation,
    interval: Duration,
) -> Result<ThreadRole, PollError> {
    tracing::info!(
        "Waiting for {} to reach [{}] (timeout {:?})",
        label,
        join_roles(&expectation.roles),
        expectation.timeout
    );

    let start = tokio::time::Instant::now();
    let deadline = start + expectation.timeout;
    let mut observed: Vec<ThreadRole> = Vec::new();

    loop {
        let role = probe.thread_role(device).await?;
        if expectation.accepts(&role) {
            tracing::info!("{} reached {} after {:?}", label, role, start.elapsed());
            return Ok(role);
        }
        tracing::debug!("{} is {}", label, role);
        if observed.last() != Some(&role) {
            observed.push(role);
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }

    tracing::error!("{} does not reach expected role", label);
    Err(PollError::Timeout(RoleTimeout {
        device: label.to_string(),
        expected: expectation.roles.clone(),
        observed,
        timeout: expectation.timeout,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of roles, repeating the last one.
    struct ScriptedProbe {
        roles: Mutex<VecDeque<ThreadRole>>,
        calls: Mutex<usize>,
        fail: bool,
    }

    impl ScriptedProbe {
        fn new(roles: &[ThreadRole]) -> Self {
            Self {
                roles: Mutex::new(roles.iter().cloned().collect()),
                calls: Mutex::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[ThreadRole::Disabled])
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl RoleProbe for ScriptedProbe {
        async fn thread_role(&self, _device: &DeviceId) -> Result<ThreadRole, BackendError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(BackendError::Injected("probe down".into()));
            }
            let mut roles = self.roles.lock().unwrap();
            if roles.len() > 1 {
                Ok(roles.pop_front().unwrap())
            } else {
                Ok(roles.front().cloned().unwrap())
            }
        }
    }

    fn device() -> DeviceId {
        DeviceId::new("0123456789ab")
    }

    #[tokio::test(start_paused = true)]
    async fn returns_on_first_match() {
        let probe = ScriptedProbe::new(&[
            ThreadRole::Detached,
            ThreadRole::Child,
            ThreadRole::Leader,
            ThreadRole::Router,
        ]);
        let exp = RoleExpectation::one(ThreadRole::Leader, Duration::from_secs(15));
        let start = tokio::time::Instant::now();

        let role = wait_for_role(&probe, &device(), "br", &exp, DEFAULT_POLL_INTERVAL)
            .await
            .unwrap();

        assert_eq!(role, ThreadRole::Leader);
        assert_eq!(probe.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn already_in_role_returns_immediately() {
        let probe = ScriptedProbe::new(&[ThreadRole::Router]);
        let exp = RoleExpectation::any_of(
            [ThreadRole::Child, ThreadRole::Router],
            Duration::from_secs(2),
        );
        let start = tokio::time::Instant::now();
        wait_for_role(&probe, &device(), "ed", &exp, DEFAULT_POLL_INTERVAL)
            .await
            .unwrap();
        assert_eq!(probe.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_bound_with_observed_roles() {
        let probe = ScriptedProbe::new(&[
            ThreadRole::Detached,
            ThreadRole::Detached,
            ThreadRole::Child,
            ThreadRole::Detached,
        ]);
        let exp = RoleExpectation::one(ThreadRole::Leader, Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let err = wait_for_role(&probe, &device(), "ed", &exp, DEFAULT_POLL_INTERVAL)
            .await
            .unwrap_err();

        let timeout = match err {
            PollError::Timeout(timeout) => timeout,
            other => panic!("expected timeout, got {:?}", other),
        };
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        // probes at 0, 0.5, 1.0, 1.5 and 2.0 seconds
        assert_eq!(probe.calls(), 5);
        assert_eq!(
            timeout.observed,
            vec![ThreadRole::Detached, ThreadRole::Child, ThreadRole::Detached]
        );
        assert_eq!(timeout.expected, vec![ThreadRole::Leader]);
        let msg = timeout.to_string();
        assert!(msg.contains("ed did not reach [leader]"));
        assert!(msg.contains("observed [detached, child, detached]"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_probes_once() {
        let probe = ScriptedProbe::new(&[ThreadRole::Child]);
        let exp = RoleExpectation::one(ThreadRole::Leader, Duration::ZERO);
        assert!(matches!(
            wait_for_role(&probe, &device(), "ed", &exp, DEFAULT_POLL_INTERVAL).await,
            Err(PollError::Timeout(_))
        ));
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_failure_aborts_wait() {
        let probe = ScriptedProbe::failing();
        let exp = RoleExpectation::one(ThreadRole::Leader, Duration::from_secs(10));
        let err = wait_for_role(&probe, &device(), "ed", &exp, DEFAULT_POLL_INTERVAL)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Backend(_)));
        assert_eq!(probe.calls(), 1);
    }
}
