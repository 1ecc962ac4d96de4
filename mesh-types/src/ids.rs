//! Identifiers handed out by the fleet service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for a device inside a virtual home.
///
/// The fleet service uses container ids, so the value is long; [`DeviceId::short`]
/// gives the 8-character prefix used in log lines and file names.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a raw device id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters of the id (or the whole id if shorter).
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.short())
    }
}

/// Handle for a virtual home created by the fleet service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeId(String);

impl HomeId {
    /// Wrap a raw home id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_short_prefix() {
        let id = DeviceId::new("3f9a2c41b7e0d5aa");
        assert_eq!(id.short(), "3f9a2c41");
        assert_eq!(format!("{:?}", id), "DeviceId(3f9a2c41)");
    }

    #[test]
    fn device_id_short_when_shorter() {
        let id = DeviceId::new("abc");
        assert_eq!(id.short(), "abc");
    }

    #[test]
    fn ids_are_transparent_json() {
        let id: HomeId = serde_json::from_str("\"home-1\"").unwrap();
        assert_eq!(id.as_str(), "home-1");
        assert_eq!(serde_json::to_string(&DeviceId::new("d1")).unwrap(), "\"d1\"");
    }
}
