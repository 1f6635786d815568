//! Conflict detection over a schedule snapshot.
//!
//! Detection is a pure function from snapshot to conflict list, so the
//! same plan always produces the same findings. The engine wrapper
//! persists the fresh set, dropping unresolved rows from earlier runs
//! and suppressing violations the planner already resolved.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::info;

use planboard_core::calendar::WeekCalendar;
use planboard_core::conflict::{Conflict, ConflictKind};
use planboard_core::ids::{OrderId, ResourceId};
use planboard_core::link::DependencyLink;
use planboard_core::resource::Resource;
use planboard_core::task::{Order, Task, TaskKind};
use planboard_store::{ConflictFilter, Store};

use crate::error::EngineError;
use crate::PlanningEngine;

/// Everything a detection run reads, captured at one point in time.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub tasks: Vec<Task>,
    pub links: Vec<DependencyLink>,
    pub resources: Vec<Resource>,
    pub orders: Vec<Order>,
    pub calendar: WeekCalendar,
}

/// Outcome of one check run.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub conflicts: Vec<Conflict>,
    /// Violations skipped because an equivalent resolved conflict exists.
    pub suppressed: usize,
}

impl CheckReport {
    pub fn count_of(&self, kind: ConflictKind) -> usize {
        self.conflicts.iter().filter(|c| c.kind == kind).count()
    }

    pub fn total(&self) -> usize {
        self.conflicts.len()
    }
}

/// The capability tag a task kind demands of its resource, if any.
pub fn required_capability(kind: TaskKind) -> Option<&'static str> {
    match kind {
        TaskKind::Operation => Some("production"),
        TaskKind::ContainerArticle => Some("assembly"),
        TaskKind::Project | TaskKind::Milestone => None,
    }
}

/// Run every detector against the snapshot. `now` becomes each
/// conflict's detection timestamp.
pub fn detect(snapshot: &ScheduleSnapshot, now: NaiveDateTime) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    detect_resource_overlaps(snapshot, now, &mut conflicts);
    detect_calendar_violations(snapshot, now, &mut conflicts);
    detect_dependency_violations(snapshot, now, &mut conflicts);
    detect_delivery_violations(snapshot, now, &mut conflicts);
    detect_qualification_mismatches(snapshot, now, &mut conflicts);
    conflicts.sort_by(|a, b| {
        (a.kind.as_str(), a.task_id, a.related_task_id)
            .cmp(&(b.kind.as_str(), b.task_id, b.related_task_id))
    });
    conflicts
}

/// Two tasks on the same resource with intersecting intervals.
fn detect_resource_overlaps(
    snapshot: &ScheduleSnapshot,
    now: NaiveDateTime,
    out: &mut Vec<Conflict>,
) {
    let mut by_resource: HashMap<ResourceId, Vec<&Task>> = HashMap::new();
    for task in &snapshot.tasks {
        if let Some(rid) = task.resource_id {
            by_resource.entry(rid).or_default().push(task);
        }
    }
    for tasks in by_resource.values_mut() {
        tasks.sort_by_key(|t| t.planned_start);
        for (i, a) in tasks.iter().enumerate() {
            for b in &tasks[i + 1..] {
                if b.planned_start >= a.planned_end() {
                    break;
                }
                out.push(Conflict::new(
                    ConflictKind::ResourceOverlap,
                    format!(
                        "'{}' and '{}' overlap on the same resource",
                        a.title, b.title
                    ),
                    a.task_id,
                    Some(b.task_id),
                    now,
                ));
            }
        }
    }
}

/// Task interval not fully inside the working calendar.
fn detect_calendar_violations(
    snapshot: &ScheduleSnapshot,
    now: NaiveDateTime,
    out: &mut Vec<Conflict>,
) {
    for task in &snapshot.tasks {
        if !snapshot
            .calendar
            .contains_interval(task.planned_start, task.planned_end())
        {
            out.push(Conflict::new(
                ConflictKind::Calendar,
                format!("'{}' lies outside working hours", task.title),
                task.task_id,
                None,
                now,
            ));
        }
    }
}

/// Successor starting before its predecessor finishes.
fn detect_dependency_violations(
    snapshot: &ScheduleSnapshot,
    now: NaiveDateTime,
    out: &mut Vec<Conflict>,
) {
    let by_id: HashMap<_, &Task> = snapshot.tasks.iter().map(|t| (t.task_id, t)).collect();
    for link in &snapshot.links {
        let (Some(pred), Some(succ)) = (
            by_id.get(&link.predecessor_id),
            by_id.get(&link.successor_id),
        ) else {
            continue;
        };
        if succ.planned_start < pred.planned_end() {
            out.push(Conflict::new(
                ConflictKind::Dependency,
                format!("'{}' starts before '{}' finishes", succ.title, pred.title),
                succ.task_id,
                Some(pred.task_id),
                now,
            ));
        }
    }
}

/// Order whose latest task ends past the end of its due day. One
/// conflict per order, anchored at the latest-ending task.
fn detect_delivery_violations(
    snapshot: &ScheduleSnapshot,
    now: NaiveDateTime,
    out: &mut Vec<Conflict>,
) {
    let mut latest: HashMap<OrderId, &Task> = HashMap::new();
    for task in &snapshot.tasks {
        let Some(order_id) = task.order_id else {
            continue;
        };
        let entry = latest.entry(order_id).or_insert(task);
        if (task.planned_end(), task.task_id) > (entry.planned_end(), entry.task_id) {
            *entry = task;
        }
    }
    for order in &snapshot.orders {
        let Some(task) = latest.get(&order.order_id) else {
            continue;
        };
        let deadline = WeekCalendar::end_of_day(order.due_date);
        if task.planned_end() > deadline {
            out.push(Conflict::new(
                ConflictKind::DeliveryDate,
                format!(
                    "'{}' ends after the due date of order {}",
                    task.title, order.number
                ),
                task.task_id,
                None,
                now,
            ));
        }
    }
}

/// Resource lacking the capability tag the task kind demands.
fn detect_qualification_mismatches(
    snapshot: &ScheduleSnapshot,
    now: NaiveDateTime,
    out: &mut Vec<Conflict>,
) {
    let resources: HashMap<ResourceId, &Resource> = snapshot
        .resources
        .iter()
        .map(|r| (r.resource_id, r))
        .collect();
    for task in &snapshot.tasks {
        let Some(tag) = required_capability(task.kind) else {
            continue;
        };
        let Some(resource) = task.resource_id.and_then(|id| resources.get(&id)) else {
            continue;
        };
        if !resource.has_capability(tag) {
            out.push(Conflict::new(
                ConflictKind::Qualification,
                format!("'{}' is not qualified for '{}'", resource.name, task.title),
                task.task_id,
                None,
                now,
            ));
        }
    }
}

impl PlanningEngine {
    pub fn snapshot(&self) -> Result<ScheduleSnapshot, EngineError> {
        Ok(ScheduleSnapshot {
            tasks: self.store().all_tasks()?,
            links: self.store().all_links()?,
            resources: self.store().all_resources()?,
            orders: self.store().all_orders()?,
            calendar: self.store().get_week_calendar()?,
        })
    }

    /// Recompute all conflicts and persist them, replacing the previous
    /// unresolved set. Violations matching a resolved conflict stay
    /// suppressed until the underlying schedule changes them away.
    pub fn check_conflicts(&mut self, now: NaiveDateTime) -> Result<CheckReport, EngineError> {
        let snapshot = self.snapshot()?;
        let detected = detect(&snapshot, now);

        let resolved = self.store().conflicts(&ConflictFilter {
            resolved: Some(true),
            ..ConflictFilter::default()
        })?;
        let before = detected.len();
        let fresh: Vec<Conflict> = detected
            .into_iter()
            .filter(|c| !resolved.iter().any(|r| r.same_violation(c)))
            .collect();
        let suppressed = before - fresh.len();

        self.store_mut().replace_unresolved_conflicts(&fresh)?;
        info!(
            detected = fresh.len(),
            suppressed, "conflict check complete"
        );
        Ok(CheckReport {
            conflicts: fresh,
            suppressed,
        })
    }
}
