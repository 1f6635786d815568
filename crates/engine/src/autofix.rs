//! Dependency auto-fixer.
//!
//! Finds every finish-to-start violation, then pushes the affected
//! subgraph forward by the minimal amount. Each successor moves to the
//! latest end among its predecessors, but never backwards, so existing
//! slack is kept. All moves land in one transaction.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use planboard_core::ids::TaskId;
use planboard_core::task::Task;
use planboard_store::Store;

use crate::error::EngineError;
use crate::graph;
use crate::PlanningEngine;

#[derive(Debug, Clone, Default)]
pub struct FixReport {
    /// Tasks whose start was moved.
    pub fixed_count: usize,
    /// Cyclic task groups that could not be shifted, one entry per
    /// connected group.
    pub unresolved_cycles: Vec<Vec<TaskId>>,
}

impl PlanningEngine {
    /// Repair every dependency violation by the minimal forward shift.
    ///
    /// Only tasks downstream of a violated link are considered; the rest
    /// of the schedule is untouched. Cyclic task groups cannot be fixed
    /// by shifting and are reported instead.
    pub fn fix_dependencies(&mut self) -> Result<FixReport, EngineError> {
        let tasks = self.store().all_tasks()?;
        let links = self.store().all_links()?;
        let mut by_id: HashMap<TaskId, Task> =
            tasks.into_iter().map(|t| (t.task_id, t)).collect();
        let edges: Vec<(TaskId, TaskId)> = links
            .iter()
            .filter(|l| by_id.contains_key(&l.predecessor_id) && by_id.contains_key(&l.successor_id))
            .map(|l| (l.predecessor_id, l.successor_id))
            .collect();

        // Successors of violated links seed the repair front.
        let seeds: HashSet<TaskId> = edges
            .iter()
            .filter(|(pred, succ)| {
                let p = &by_id[pred];
                let s = &by_id[succ];
                s.planned_start < p.planned_end()
            })
            .map(|(_, succ)| *succ)
            .collect();
        if seeds.is_empty() {
            return Ok(FixReport::default());
        }

        let affected = graph::reachable_from(&seeds, &edges);
        let (ordered, stuck) = graph::topo_order(&affected, &edges);

        let mut unresolved_cycles = Vec::new();
        if !stuck.is_empty() {
            let core = graph::cycle_core(&stuck, &edges);
            unresolved_cycles = graph::cycle_components(&core, &edges);
            warn!(
                groups = unresolved_cycles.len(),
                tasks = core.len(),
                "cycles cannot be repaired by shifting"
            );
        }

        let mut predecessors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for (pred, succ) in &edges {
            predecessors.entry(*succ).or_default().push(*pred);
        }

        // Walk in topological order so every predecessor already carries
        // its shifted position when a successor is placed.
        let mut moves: Vec<(TaskId, chrono::NaiveDateTime)> = Vec::new();
        for task_id in &ordered {
            let latest_pred_end = predecessors
                .get(task_id)
                .into_iter()
                .flatten()
                .filter_map(|p| by_id.get(p))
                .map(|p| p.planned_end())
                .max();
            let Some(required) = latest_pred_end else {
                continue;
            };
            let task = &by_id[task_id];
            if task.planned_start < required {
                moves.push((*task_id, required));
                if let Some(t) = by_id.get_mut(task_id) {
                    t.planned_start = required;
                }
            }
        }

        if moves.is_empty() {
            return Ok(FixReport {
                fixed_count: 0,
                unresolved_cycles,
            });
        }

        self.exec_batch("BEGIN IMMEDIATE")?;
        let applied = (|| -> Result<(), EngineError> {
            let store = self.store_mut();
            for (task_id, start) in &moves {
                store.update_task_start(*task_id, *start)?;
            }
            Ok(())
        })();
        match applied {
            Ok(()) => self.exec_batch("COMMIT")?,
            Err(e) => {
                self.exec_batch("ROLLBACK")?;
                return Err(e);
            }
        }

        info!(moved = moves.len(), "dependency auto-fix applied");
        Ok(FixReport {
            fixed_count: moves.len(),
            unresolved_cycles,
        })
    }
}
