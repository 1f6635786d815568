use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{OrderId, ResourceId, TaskId};

/// All durations are snapped to this grid.
pub const DURATION_GRID_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Operation,
    ContainerArticle,
    Project,
    Milestone,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operation => "operation",
            Self::ContainerArticle => "container_article",
            Self::Project => "project",
            Self::Milestone => "milestone",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "operation" => Ok(Self::Operation),
            "container_article" => Ok(Self::ContainerArticle),
            "project" => Ok(Self::Project),
            "milestone" => Ok(Self::Milestone),
            _ => Err(CoreError::Parse(format!("unknown task kind: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Planned,
    Released,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Released => "released",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "planned" => Ok(Self::Planned),
            "released" => Ok(Self::Released),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            _ => Err(CoreError::Parse(format!("unknown task status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(CoreError::Parse(format!("unknown task priority: {s}"))),
        }
    }
}

/// A schedulable unit of work on the plan board.
///
/// `order_id` and the `erp_*` fields are read-only linkage into the ERP;
/// the sync engine never lets a client update them after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub title: String,
    pub planned_start: NaiveDateTime,
    pub duration_minutes: i64,
    pub resource_id: Option<ResourceId>,
    pub parent_id: Option<TaskId>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress: u8,
    pub order_id: Option<OrderId>,
    pub erp_article_no: Option<String>,
    pub erp_workplan_no: Option<String>,
}

impl Task {
    pub fn planned_end(&self) -> NaiveDateTime {
        self.planned_start + Duration::minutes(self.duration_minutes)
    }

    /// Whether the [start, end) intervals of two tasks intersect.
    pub fn overlaps(&self, other: &Task) -> bool {
        self.planned_start < other.planned_end() && other.planned_start < self.planned_end()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_duration(self.duration_minutes)?;
        validate_progress(self.progress)?;
        Ok(())
    }
}

/// An ERP production order a task chain belongs to. Read-mostly: the
/// delivery-date check compares against `due_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub number: String,
    pub due_date: NaiveDate,
}

pub fn validate_duration(minutes: i64) -> Result<(), CoreError> {
    if minutes <= 0 || minutes % DURATION_GRID_MINUTES != 0 {
        return Err(CoreError::InvalidDuration { minutes });
    }
    Ok(())
}

pub fn validate_progress(progress: u8) -> Result<(), CoreError> {
    if progress > 100 {
        return Err(CoreError::InvalidProgress(progress));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_at(start: &str, minutes: i64) -> Task {
        Task {
            task_id: TaskId::new(),
            kind: TaskKind::Operation,
            title: "op".into(),
            planned_start: NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap(),
            duration_minutes: minutes,
            resource_id: None,
            parent_id: None,
            status: TaskStatus::Planned,
            priority: TaskPriority::Normal,
            progress: 0,
            order_id: None,
            erp_article_no: None,
            erp_workplan_no: None,
        }
    }

    #[test]
    fn planned_end_adds_duration() {
        let t = task_at("2026-03-02 09:00", 45);
        assert_eq!(
            t.planned_end(),
            NaiveDateTime::parse_from_str("2026-03-02 09:45", "%Y-%m-%d %H:%M").unwrap()
        );
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = task_at("2026-03-02 09:00", 60);
        let b = task_at("2026-03-02 10:00", 60);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn intersecting_intervals_overlap() {
        let a = task_at("2026-03-02 09:00", 60);
        let b = task_at("2026-03-02 09:30", 60);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn duration_must_be_positive_grid_multiple() {
        assert!(validate_duration(45).is_ok());
        assert!(validate_duration(0).is_err());
        assert!(validate_duration(-15).is_err());
        assert!(validate_duration(20).is_err());
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            TaskKind::Operation,
            TaskKind::ContainerArticle,
            TaskKind::Project,
            TaskKind::Milestone,
        ] {
            assert_eq!(TaskKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(TaskKind::parse("bogus").is_err());
    }
}
