//! # meshbed-harness
//!
//! Scenario orchestration and verification engine for multi-device Thread/Matter
//! integration tests.
//!
//! A scenario provisions a virtual home, resets and optionally forms the mesh network,
//! runs a remote test binary on the controller and checks the binary's output against an
//! expected attribute-report transcript.
//!
//! ## Components
//!
//! - [`backend`] - Fleet services that host virtual homes ([`CirqueClient`], [`MockHome`])
//! - [`VirtualHome`] - Session over one home: commands, logs, mesh reset, teardown
//! - [`wait_for_role`] - Role polling with timeout
//! - [`form_network`] - Network formation on a border router
//! - [`RemoteTest`] - Remote test command line and crash classification
//! - [`verify`] - Attribute report verification
//! - [`ScenarioDriver`] - Per-test state machine
//! - [`HarnessConfig`] - TOML configuration
//!
//! ## Example
//!
//! ```no_run
//! use meshbed_harness::{scenario, CirqueClient, HarnessConfig, ScenarioDriver, VirtualHome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::default().with_env_overrides();
//! let backend = CirqueClient::new(config.cirque_config())?;
//! let home = VirtualHome::new(backend, config.home_settings());
//!
//! let scenario = scenario::find("basic-cluster-attrs").ok_or("unknown scenario")?;
//! let mut driver = ScenarioDriver::new(scenario, home);
//! let result = driver.run_test(config.log_dir()).await;
//! std::process::exit(result.exit_code());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod formation;
pub mod home;
pub mod invoker;
pub mod poller;
pub mod scenario;
pub mod verifier;

pub use backend::{BackendError, CirqueClient, CirqueConfig, HomeBackend, MockHome};
pub use config::{ConfigError, HarnessConfig};
pub use error::{ScenarioError, TestResult};
pub use formation::{form_network, FormationPlan};
pub use home::{HomeSettings, ResetPolicy, VirtualHome};
pub use invoker::{Invocation, RemoteTest};
pub use poller::{wait_for_role, PollError, RoleProbe, RoleTimeout};
pub use scenario::{Scenario, ScenarioDriver, ScenarioState};
pub use verifier::{missing_reports, verify, VerificationFailure};
