//! Client-originated sync payloads and their server acknowledgements.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{LinkId, ResourceId, TaskId};
use crate::link::DependencyLink;
use crate::task::{Task, TaskPriority, TaskStatus};

/// Editable fields of an existing task. The ERP linkage columns are
/// deliberately absent: they are read-only after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub task_id: TaskId,
    pub title: String,
    pub planned_start: NaiveDateTime,
    pub duration_minutes: i64,
    pub resource_id: Option<ResourceId>,
    pub parent_id: Option<TaskId>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress: u8,
}

impl TaskUpdate {
    /// The update a client would stage for an unchanged task.
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.task_id,
            title: task.title.clone(),
            planned_start: task.planned_start,
            duration_minutes: task.duration_minutes,
            resource_id: task.resource_id,
            parent_id: task.parent_id,
            status: task.status,
            priority: task.priority,
            progress: task.progress,
        }
    }
}

/// One atomic batch of client edits: applied entirely or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncDelta {
    pub created_tasks: Vec<Task>,
    pub updated_tasks: Vec<TaskUpdate>,
    pub deleted_task_ids: Vec<TaskId>,
    pub created_links: Vec<DependencyLink>,
    pub deleted_link_ids: Vec<LinkId>,
}

impl SyncDelta {
    pub fn is_empty(&self) -> bool {
        self.created_tasks.is_empty()
            && self.updated_tasks.is_empty()
            && self.deleted_task_ids.is_empty()
            && self.created_links.is_empty()
            && self.deleted_link_ids.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.created_tasks.len()
            + self.updated_tasks.len()
            + self.deleted_task_ids.len()
            + self.created_links.len()
            + self.deleted_link_ids.len()
    }
}

/// Server-recomputed fields for one affected task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAck {
    pub task_id: TaskId,
    pub planned_end: NaiveDateTime,
}

/// Acknowledgement of a fully applied delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncAck {
    pub acks: Vec<TaskAck>,
}

impl SyncAck {
    pub fn planned_end(&self, task_id: TaskId) -> Option<NaiveDateTime> {
        self.acks
            .iter()
            .find(|a| a.task_id == task_id)
            .map(|a| a.planned_end)
    }
}

/// Lightweight drag-feedback update: start/duration/progress only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub task_id: TaskId,
    pub planned_start: NaiveDateTime,
    pub duration_minutes: i64,
    pub progress: u8,
}

/// Per-item result of a batch position update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionOutcome {
    Applied {
        task_id: TaskId,
        planned_end: NaiveDateTime,
    },
    Rejected {
        task_id: TaskId,
        reason: String,
    },
}
