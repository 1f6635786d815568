use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{LinkId, TaskId};

/// Precedence semantics of a dependency link. Only finish-to-start is
/// scheduled today; the enum stays closed so new variants cannot be
/// silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    FinishToStart,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinishToStart => "finish_to_start",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "finish_to_start" => Ok(Self::FinishToStart),
            _ => Err(CoreError::Parse(format!("unknown link type: {s}"))),
        }
    }
}

/// A directed precedence constraint: the successor may not start before
/// the predecessor finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLink {
    pub link_id: LinkId,
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
    pub link_type: LinkType,
}

impl DependencyLink {
    pub fn finish_to_start(predecessor_id: TaskId, successor_id: TaskId) -> Self {
        Self {
            link_id: LinkId::new(),
            predecessor_id,
            successor_id,
            link_type: LinkType::FinishToStart,
        }
    }
}
