use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{ConflictId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    ResourceOverlap,
    Calendar,
    Dependency,
    DeliveryDate,
    Qualification,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceOverlap => "resource_overlap",
            Self::Calendar => "calendar",
            Self::Dependency => "dependency",
            Self::DeliveryDate => "delivery_date",
            Self::Qualification => "qualification",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "resource_overlap" => Ok(Self::ResourceOverlap),
            "calendar" => Ok(Self::Calendar),
            "dependency" => Ok(Self::Dependency),
            "delivery_date" => Ok(Self::DeliveryDate),
            "qualification" => Ok(Self::Qualification),
            _ => Err(CoreError::Parse(format!("unknown conflict kind: {s}"))),
        }
    }

    /// Severity is fixed per kind: resource and ordering violations are
    /// hard errors, calendar and qualification mismatches are warnings.
    pub fn severity(&self) -> Severity {
        match self {
            Self::ResourceOverlap | Self::Dependency | Self::DeliveryDate => Severity::Error,
            Self::Calendar | Self::Qualification => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            _ => Err(CoreError::Parse(format!("unknown severity: {s}"))),
        }
    }
}

/// A derived scheduling violation. Conflicts are recomputed wholesale by
/// each check run; `resolved` only suppresses re-surfacing and never
/// changes the schedule itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: ConflictId,
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    pub task_id: TaskId,
    pub related_task_id: Option<TaskId>,
    pub resolved: bool,
    pub detected_at: NaiveDateTime,
}

impl Conflict {
    pub fn new(
        kind: ConflictKind,
        description: String,
        task_id: TaskId,
        related_task_id: Option<TaskId>,
        detected_at: NaiveDateTime,
    ) -> Self {
        Self {
            conflict_id: ConflictId::new(),
            kind,
            severity: kind.severity(),
            description,
            task_id,
            related_task_id,
            resolved: false,
            detected_at,
        }
    }

    /// Two conflicts describe the same violation if kind and the involved
    /// tasks match. Used to suppress re-surfacing of resolved conflicts.
    pub fn same_violation(&self, other: &Conflict) -> bool {
        self.kind == other.kind
            && self.task_id == other.task_id
            && self.related_task_id == other.related_task_id
    }
}
