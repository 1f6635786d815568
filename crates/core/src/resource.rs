use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Department,
    Machine,
    Employee,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Machine => "machine",
            Self::Employee => "employee",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "department" => Ok(Self::Department),
            "machine" => Ok(Self::Machine),
            "employee" => Ok(Self::Employee),
            _ => Err(CoreError::Parse(format!("unknown resource kind: {s}"))),
        }
    }
}

/// A department, machine, or employee tasks can be assigned to.
///
/// `erp_id` is the identity in the ERP system of record; resource sync
/// matches on it. Machines and employees point at their department via
/// `erp_department_id` for hierarchical filtering. `level` is the
/// importance tier (1 most critical .. 5 all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: ResourceId,
    pub kind: ResourceKind,
    pub name: String,
    pub erp_id: String,
    pub erp_department_id: Option<String>,
    pub level: u8,
    pub capabilities: Vec<String>,
    pub active: bool,
}

impl Resource {
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| c == tag)
    }
}

/// One master-data row pulled from the ERP during resource sync. The ERP's
/// own schema stays behind this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMaster {
    pub kind: ResourceKind,
    pub name: String,
    pub erp_id: String,
    pub erp_department_id: Option<String>,
    pub level: u8,
    pub capabilities: Vec<String>,
}

pub fn validate_level(level: u8) -> Result<(), CoreError> {
    if !(1..=5).contains(&level) {
        return Err(CoreError::InvalidLevel(level));
    }
    Ok(())
}
