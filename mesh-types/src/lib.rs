//! # meshbed-types
//!
//! Data model for the meshbed multi-device integration-test orchestrator.
//!
//! This crate provides the types shared by the harness and the CLI:
//! - [`DeviceConfig`], [`DeviceSpec`], [`RoleType`], [`Capability`] - Declarative topology
//! - [`DeviceDescriptor`], [`HomeDevices`] - Devices as reported by the fleet service
//! - [`ThreadRole`] - Mesh role parsed from `ot-ctl state`
//! - [`ExpectedAttributeReport`] - Attribute reads a test binary must print
//! - [`ExecutionResult`], [`ExitStatus`] - Outcome of a remote command
//! - [`ThreadDataset`] - Operational dataset used to form a network
//! - [`MeshError`], [`LookupError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dataset;
mod error;
mod exec;
mod ids;
mod report;
mod role;
mod topology;

pub use dataset::ThreadDataset;
pub use error::{LookupError, MeshError};
pub use exec::{ExecutionResult, ExitStatus, ReturnCode};
pub use ids::{DeviceId, HomeId};
pub use report::{
    AttributeId, AttributeType, ClusterId, ExpectedAttributeReport, REPORT_PREFIX,
    SUCCESS_STATUS,
};
pub use role::{RoleExpectation, ThreadRole};
pub use topology::{
    Capability, CapabilitySet, DeviceConfig, DeviceDescription, DeviceDescriptor, DeviceSpec,
    HomeDevices, RoleType,
};
