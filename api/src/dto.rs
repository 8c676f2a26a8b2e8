//! Wire-level request and response bodies

use chrono::{DateTime, Utc};
use inv_common::{Attribute, AttributeValue, Device, Error, Result, Scope};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Wire form of a device attribute
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttributeDto {
    /// Attribute name
    pub name: String,
    /// String, number, or homogeneous array thereof
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    /// Scope name; omitted means `inventory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttributeDto {
    /// Convert into the model attribute, defaulting the scope for
    /// unscoped submissions.
    pub fn into_attribute(self, default_scope: Scope) -> Result<Attribute> {
        let scope = match self.scope.as_deref() {
            Some(s) => {
                Scope::parse(s).ok_or_else(|| Error::invalid(format!("unknown scope '{}'", s)))?
            }
            None => default_scope,
        };
        let value: AttributeValue = serde_json::from_value(self.value).map_err(|_| {
            Error::invalid("attribute value must be a string, number, or homogeneous array")
        })?;
        Ok(Attribute {
            name: self.name,
            value,
            scope,
            description: self.description,
        })
    }
}

impl From<&Attribute> for AttributeDto {
    fn from(attr: &Attribute) -> Self {
        let value = serde_json::to_value(&attr.value).unwrap_or(serde_json::Value::Null);
        AttributeDto {
            name: attr.name.clone(),
            value,
            scope: Some(attr.scope.as_str().to_string()),
            description: attr.description.clone(),
        }
    }
}

/// Device as returned by the management API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceDto {
    /// Device identifier
    pub id: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attribute bag, all scopes
    pub attributes: Vec<AttributeDto>,
    /// Current group membership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Timestamp of the last attribute update
    pub updated_ts: DateTime<Utc>,
}

impl From<&Device> for DeviceDto {
    fn from(device: &Device) -> Self {
        DeviceDto {
            id: device.id.to_string(),
            description: device.description.clone(),
            attributes: device.attributes.iter().map(AttributeDto::from).collect(),
            group: device.group.as_ref().map(|g| g.to_string()),
            updated_ts: device.updated_ts,
        }
    }
}

/// Device provisioning request (internal API)
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeviceNew {
    /// Device identifier
    pub id: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Initial attributes; unscoped entries land in `inventory`
    #[serde(default)]
    pub attributes: Vec<AttributeDto>,
}

/// Group assignment request body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupBody {
    /// Group to assign the device to
    pub group: String,
}

/// Device group response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupDto {
    /// Current group, if any
    pub group: Option<String>,
}

/// Tenant provisioning request (internal API)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantNew {
    /// Tenant identifier
    pub tenant_id: String,
}
