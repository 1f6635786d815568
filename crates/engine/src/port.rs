//! Seam between the planner session and whatever draws the chart.

use chrono::NaiveDateTime;

use planboard_core::ids::{LinkId, ResourceId, TaskId};

use crate::Schedule;

/// One user gesture on the chart, already translated out of widget
/// coordinates into schedule terms.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEdit {
    Moved {
        task_id: TaskId,
        planned_start: NaiveDateTime,
    },
    Resized {
        task_id: TaskId,
        duration_minutes: i64,
    },
    Reassigned {
        task_id: TaskId,
        resource_id: Option<ResourceId>,
    },
    ProgressChanged {
        task_id: TaskId,
        progress: u8,
    },
    Linked {
        predecessor_id: TaskId,
        successor_id: TaskId,
    },
    Unlinked {
        link_id: LinkId,
    },
}

/// Rendering side of the planner session. The session drives the chart
/// through this trait only, so tests can substitute a recording fake.
pub trait ChartPort {
    fn render(&mut self, schedule: &Schedule);
    fn scroll_to(&mut self, task_id: TaskId);
}
