//! Atomic application of client edit batches.
//!
//! A delta is validated in full against the current schedule before any
//! row is touched. Application then runs inside one IMMEDIATE
//! transaction: either every change lands or none does.

use std::collections::HashSet;

use tracing::{info, warn};

use planboard_core::delta::{PositionOutcome, PositionUpdate, SyncAck, SyncDelta, TaskAck};
use planboard_core::ids::{LinkId, TaskId};
use planboard_core::task::{validate_duration, validate_progress};
use planboard_store::Store;

use crate::error::EngineError;
use crate::graph;
use crate::PlanningEngine;

impl PlanningEngine {
    /// Apply one batch of client edits atomically.
    ///
    /// Validation covers field-level rules (duration grid, progress
    /// range), referential integrity (tasks, links, resources) and
    /// acyclicity of the dependency graph as it would look after the
    /// delta. The first violation rejects the whole batch.
    pub fn apply_sync(&mut self, delta: &SyncDelta) -> Result<SyncAck, EngineError> {
        if delta.is_empty() {
            return Ok(SyncAck::default());
        }
        self.validate_delta(delta)?;

        self.exec_batch("BEGIN IMMEDIATE")?;
        let applied = (|| -> Result<SyncAck, EngineError> {
            let store = self.store_mut();
            for task in &delta.created_tasks {
                store.insert_task(task)?;
            }
            for update in &delta.updated_tasks {
                store.update_task(update)?;
            }
            for link_id in &delta.deleted_link_ids {
                store.delete_link(*link_id)?;
            }
            for task_id in &delta.deleted_task_ids {
                store.delete_task(*task_id)?;
            }
            for link in &delta.created_links {
                store.insert_link(link)?;
            }

            let mut acks = Vec::new();
            for task in &delta.created_tasks {
                acks.push(TaskAck {
                    task_id: task.task_id,
                    planned_end: task.planned_end(),
                });
            }
            for update in &delta.updated_tasks {
                let task = store
                    .get_task(update.task_id)?
                    .ok_or_else(|| EngineError::TaskNotFound(update.task_id.to_string()))?;
                acks.push(TaskAck {
                    task_id: task.task_id,
                    planned_end: task.planned_end(),
                });
            }
            Ok(SyncAck { acks })
        })();

        match applied {
            Ok(ack) => {
                self.exec_batch("COMMIT")?;
                info!(changes = delta.change_count(), "sync delta applied");
                Ok(ack)
            }
            Err(e) => {
                self.exec_batch("ROLLBACK")?;
                warn!(error = %e, "sync delta rolled back");
                Err(e)
            }
        }
    }

    /// Lightweight drag feedback: each item is validated and applied on
    /// its own, so one bad update does not hold up the rest.
    pub fn update_positions(
        &mut self,
        updates: &[PositionUpdate],
    ) -> Result<Vec<PositionOutcome>, EngineError> {
        let mut outcomes = Vec::with_capacity(updates.len());
        for update in updates {
            match self.try_position(update) {
                Ok(planned_end) => outcomes.push(PositionOutcome::Applied {
                    task_id: update.task_id,
                    planned_end,
                }),
                Err(e) => {
                    // Store and I/O failures still abort; only
                    // validation problems become per-item rejections.
                    if let EngineError::Store(_) = e {
                        return Err(e);
                    }
                    outcomes.push(PositionOutcome::Rejected {
                        task_id: update.task_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    fn try_position(
        &mut self,
        update: &PositionUpdate,
    ) -> Result<chrono::NaiveDateTime, EngineError> {
        validate_duration(update.duration_minutes)?;
        validate_progress(update.progress)?;
        self.require_task(update.task_id)?;
        self.store_mut().update_position(update)?;
        Ok(update.planned_start + chrono::Duration::minutes(update.duration_minutes))
    }

    fn validate_delta(&self, delta: &SyncDelta) -> Result<(), EngineError> {
        let deleted_tasks: HashSet<TaskId> = delta.deleted_task_ids.iter().copied().collect();
        let deleted_links: HashSet<LinkId> = delta.deleted_link_ids.iter().copied().collect();
        let created_ids: HashSet<TaskId> =
            delta.created_tasks.iter().map(|t| t.task_id).collect();

        for task in &delta.created_tasks {
            task.validate()?;
            if self.store().get_task(task.task_id)?.is_some() {
                return Err(EngineError::TaskAlreadyExists(task.task_id.to_string()));
            }
            if let Some(rid) = task.resource_id {
                self.require_live_resource(rid)?;
            }
        }
        for update in &delta.updated_tasks {
            validate_duration(update.duration_minutes)?;
            validate_progress(update.progress)?;
            if deleted_tasks.contains(&update.task_id) {
                return Err(EngineError::TaskNotFound(update.task_id.to_string()));
            }
            self.require_task(update.task_id)?;
            if let Some(rid) = update.resource_id {
                self.require_live_resource(rid)?;
            }
        }
        for task_id in &delta.deleted_task_ids {
            self.require_task(*task_id)?;
        }
        for link_id in &delta.deleted_link_ids {
            if self.store().get_link(*link_id)?.is_none() {
                return Err(EngineError::LinkNotFound(link_id.to_string()));
            }
        }

        let task_exists = |id: TaskId| -> Result<bool, EngineError> {
            if deleted_tasks.contains(&id) {
                return Ok(false);
            }
            if created_ids.contains(&id) {
                return Ok(true);
            }
            Ok(self.store().get_task(id)?.is_some())
        };
        for link in &delta.created_links {
            if !task_exists(link.predecessor_id)? {
                return Err(EngineError::TaskNotFound(link.predecessor_id.to_string()));
            }
            if !task_exists(link.successor_id)? {
                return Err(EngineError::TaskNotFound(link.successor_id.to_string()));
            }
        }

        // Acyclicity over the graph as it would look after the delta.
        let mut edges: Vec<(TaskId, TaskId)> = self
            .store()
            .all_links()?
            .into_iter()
            .filter(|l| !deleted_links.contains(&l.link_id))
            .filter(|l| {
                !deleted_tasks.contains(&l.predecessor_id)
                    && !deleted_tasks.contains(&l.successor_id)
            })
            .map(|l| (l.predecessor_id, l.successor_id))
            .collect();
        edges.extend(
            delta
                .created_links
                .iter()
                .map(|l| (l.predecessor_id, l.successor_id)),
        );
        if let Some(cycle) = graph::find_cycle(&edges) {
            let names: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
            return Err(EngineError::CycleDetected(names.join(" -> ")));
        }

        Ok(())
    }
}
