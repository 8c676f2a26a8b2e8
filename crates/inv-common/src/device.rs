//! Device and group identifiers, and the device record itself

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attrs::AttributeSet;
use crate::error::{Error, Result};
use crate::MAX_ID_LEN;

/// Device identifier. Non-empty, bounded length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap a device identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::invalid("device id must not be empty"));
        }
        if id.len() > MAX_ID_LEN {
            return Err(Error::invalid(format!(
                "device id exceeds {} bytes",
                MAX_ID_LEN
            )));
        }
        Ok(DeviceId(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Group name. Non-empty; upper/lowercase alphanumerics, dash and
/// underscore only. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(String);

impl GroupName {
    /// Validate and wrap a group name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("group name must not be empty"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid(
                "group name can only contain: upper/lowercase alphanum, -(dash), _(underscore)",
            ));
        }
        Ok(GroupName(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A device record inside one tenant namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique identifier within the namespace
    pub id: DeviceId,
    /// Optional free-text description set at provisioning time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attribute bag, unique per (scope, name)
    #[serde(default)]
    pub attributes: AttributeSet,
    /// Current group membership; a device belongs to at most one group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupName>,
    /// Opaque revision token; changes on every tag mutation
    pub revision: String,
    /// Creation timestamp
    pub created_ts: DateTime<Utc>,
    /// Timestamp of the last attribute update
    pub updated_ts: DateTime<Utc>,
}
