//! Attribute reports a device-under-test prints after a successful read.
//!
//! The test binaries log each report as a five-line block:
//!
//! ```text
//! CHIP:ZCL:   ClusterId: 0x0028
//! CHIP:ZCL:   attributeId: 0x0001
//! CHIP:ZCL:   status: EMBER_ZCL_STATUS_SUCCESS (0x00)
//! CHIP:ZCL:   attributeType: 0x42
//! CHIP:ZCL:   value: TEST_VENDOR
//! ```
//!
//! Only successful reads have a block; the status line is always the success marker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MeshError;

/// Prefix of every line in a report block.
pub const REPORT_PREFIX: &str = "CHIP:ZCL:   ";

/// Status printed for a successful attribute read.
pub const SUCCESS_STATUS: &str = "EMBER_ZCL_STATUS_SUCCESS (0x00)";

fn parse_hex(s: &str, digits: usize) -> Result<u32, MeshError> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| MeshError::InvalidIdentifier(format!("{} lacks 0x prefix", s)))?;
    if hex.is_empty() || hex.len() > digits {
        return Err(MeshError::InvalidIdentifier(format!(
            "{} is not a {}-digit hex value",
            s, digits
        )));
    }
    u32::from_str_radix(hex, 16).map_err(|e| MeshError::InvalidIdentifier(format!("{}: {}", s, e)))
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $digits:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!("0x{:0", $digits, "x}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = MeshError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = parse_hex(s, $digits)?;
                <$inner>::try_from(value)
                    .map(Self)
                    .map_err(|_| MeshError::InvalidIdentifier(s.into()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = MeshError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_string()
            }
        }
    };
}

hex_id!(
    /// Cluster identifier, printed as `0x` plus 4 lowercase hex digits.
    ClusterId, u16, 4
);
hex_id!(
    /// Attribute identifier, printed as `0x` plus 4 lowercase hex digits.
    AttributeId, u16, 4
);
hex_id!(
    /// Attribute data type, printed as `0x` plus 2 lowercase hex digits.
    AttributeType, u8, 2
);

/// One attribute read a scenario expects to find in the test output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedAttributeReport {
    /// Cluster the attribute belongs to.
    pub cluster_id: ClusterId,
    /// Attribute within the cluster.
    pub attribute_id: AttributeId,
    /// Data type the device reported.
    pub attribute_type: AttributeType,
    /// Value exactly as the device prints it.
    pub value: String,
}

impl ExpectedAttributeReport {
    /// Create an expected report.
    pub fn new(cluster: u16, attribute: u16, attribute_type: u8, value: &str) -> Self {
        Self {
            cluster_id: ClusterId(cluster),
            attribute_id: AttributeId(attribute),
            attribute_type: AttributeType(attribute_type),
            value: value.into(),
        }
    }

    /// Canonical block the device prints for this report, without a trailing newline.
    pub fn block(&self) -> String {
        format!(
            "{p}ClusterId: {}\n{p}attributeId: {}\n{p}status: {}\n{p}attributeType: {}\n{p}value: {}",
            self.cluster_id,
            self.attribute_id,
            SUCCESS_STATUS,
            self.attribute_type,
            self.value,
            p = REPORT_PREFIX,
        )
    }
}
