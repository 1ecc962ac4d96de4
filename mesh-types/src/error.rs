//! Error types for meshbed data.

use thiserror::Error;

use crate::topology::RoleType;

/// Errors raised while building or validating meshbed data.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Topology does not satisfy its invariants.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Hex identifier could not be parsed.
    #[error("invalid hex identifier: {0}")]
    InvalidIdentifier(String),

    /// Dataset field out of range.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// Device description lacks a usable address.
    #[error("device {device} has no usable IPv4 address")]
    MissingAddress {
        /// Device the address was requested for.
        device: String,
    },
}

/// Result of resolving a singleton role in a set of devices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No device carries the role.
    #[error("no {0} device in topology")]
    NotFound(RoleType),

    /// More than one device carries a role that must be unique.
    #[error("expected exactly one {role} device, found {count}")]
    Ambiguous {
        /// Role that was looked up.
        role: RoleType,
        /// Number of matching devices.
        count: usize,
    },
}
