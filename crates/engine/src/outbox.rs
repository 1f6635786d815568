//! Client-side staging of edits and the planner session around it.
//!
//! Edits accumulate in an outbox and go to the engine as one atomic
//! delta on flush. Per task the outbox keeps only the newest state, so
//! dragging a bar ten times still syncs as a single update.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use planboard_core::delta::{SyncAck, SyncDelta, TaskUpdate};
use planboard_core::ids::{LinkId, TaskId};
use planboard_core::link::DependencyLink;
use planboard_core::task::Task;
use planboard_store::ScheduleFilter;

use crate::error::EngineError;
use crate::port::{ChartEdit, ChartPort};
use crate::PlanningEngine;

pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Pending local edits, keyed so repeated edits to one task coalesce.
#[derive(Debug, Clone)]
pub struct Outbox {
    capacity: usize,
    created: BTreeMap<TaskId, Task>,
    updated: BTreeMap<TaskId, TaskUpdate>,
    deleted_tasks: BTreeSet<TaskId>,
    created_links: BTreeMap<LinkId, DependencyLink>,
    deleted_links: BTreeSet<LinkId>,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_OUTBOX_CAPACITY)
    }
}

impl Outbox {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            created: BTreeMap::new(),
            updated: BTreeMap::new(),
            deleted_tasks: BTreeSet::new(),
            created_links: BTreeMap::new(),
            deleted_links: BTreeSet::new(),
        }
    }

    pub fn change_count(&self) -> usize {
        self.created.len()
            + self.updated.len()
            + self.deleted_tasks.len()
            + self.created_links.len()
            + self.deleted_links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }

    fn ensure_room(&self) -> Result<(), EngineError> {
        if self.change_count() >= self.capacity {
            return Err(EngineError::OutboxFull(self.change_count()));
        }
        Ok(())
    }

    /// The staged state of a task, if the outbox holds one.
    pub fn staged_update(&self, task_id: TaskId) -> Option<TaskUpdate> {
        if let Some(task) = self.created.get(&task_id) {
            return Some(TaskUpdate::from_task(task));
        }
        self.updated.get(&task_id).cloned()
    }

    pub fn stage_create(&mut self, task: Task) -> Result<(), EngineError> {
        if !self.created.contains_key(&task.task_id) {
            self.ensure_room()?;
        }
        self.created.insert(task.task_id, task);
        Ok(())
    }

    /// Stage an update, replacing any earlier one for the same task. An
    /// update to a locally created task folds into the creation; a task
    /// staged for deletion silently swallows it, keeping the pending
    /// delta free of update-then-delete contradictions.
    pub fn stage_update(&mut self, update: TaskUpdate) -> Result<(), EngineError> {
        if self.deleted_tasks.contains(&update.task_id) {
            return Ok(());
        }
        if let Some(task) = self.created.get_mut(&update.task_id) {
            task.title = update.title;
            task.planned_start = update.planned_start;
            task.duration_minutes = update.duration_minutes;
            task.resource_id = update.resource_id;
            task.parent_id = update.parent_id;
            task.status = update.status;
            task.priority = update.priority;
            task.progress = update.progress;
            return Ok(());
        }
        if !self.updated.contains_key(&update.task_id) {
            self.ensure_room()?;
        }
        self.updated.insert(update.task_id, update);
        Ok(())
    }

    /// Stage a deletion. A locally created task just disappears; links
    /// staged against the task go with it.
    pub fn stage_delete(&mut self, task_id: TaskId) -> Result<(), EngineError> {
        self.created_links
            .retain(|_, l| l.predecessor_id != task_id && l.successor_id != task_id);
        self.updated.remove(&task_id);
        if self.created.remove(&task_id).is_some() {
            return Ok(());
        }
        if !self.deleted_tasks.contains(&task_id) {
            self.ensure_room()?;
        }
        self.deleted_tasks.insert(task_id);
        Ok(())
    }

    pub fn stage_link(&mut self, link: DependencyLink) -> Result<(), EngineError> {
        if !self.created_links.contains_key(&link.link_id) {
            self.ensure_room()?;
        }
        self.created_links.insert(link.link_id, link);
        Ok(())
    }

    /// Stage a link removal. A locally created link just disappears.
    pub fn stage_unlink(&mut self, link_id: LinkId) -> Result<(), EngineError> {
        if self.created_links.remove(&link_id).is_some() {
            return Ok(());
        }
        if !self.deleted_links.contains(&link_id) {
            self.ensure_room()?;
        }
        self.deleted_links.insert(link_id);
        Ok(())
    }

    /// Drain everything into a delta, leaving the outbox empty.
    pub fn take_delta(&mut self) -> SyncDelta {
        SyncDelta {
            created_tasks: std::mem::take(&mut self.created).into_values().collect(),
            updated_tasks: std::mem::take(&mut self.updated).into_values().collect(),
            deleted_task_ids: std::mem::take(&mut self.deleted_tasks).into_iter().collect(),
            created_links: std::mem::take(&mut self.created_links)
                .into_values()
                .collect(),
            deleted_link_ids: std::mem::take(&mut self.deleted_links)
                .into_iter()
                .collect(),
        }
    }

    /// Put a rejected delta back, newest staged state winning.
    pub fn restore(&mut self, delta: SyncDelta) {
        for task in delta.created_tasks {
            self.created.entry(task.task_id).or_insert(task);
        }
        for update in delta.updated_tasks {
            self.updated.entry(update.task_id).or_insert(update);
        }
        self.deleted_tasks.extend(delta.deleted_task_ids);
        for link in delta.created_links {
            self.created_links.entry(link.link_id).or_insert(link);
        }
        self.deleted_links.extend(delta.deleted_link_ids);
    }
}

/// One planner's editing session: engine, pending outbox, the active
/// schedule filter and the chart behind its port.
pub struct PlannerSession<P: ChartPort> {
    engine: PlanningEngine,
    outbox: Outbox,
    filter: ScheduleFilter,
    port: P,
}

impl<P: ChartPort> PlannerSession<P> {
    pub fn new(engine: PlanningEngine, port: P) -> Self {
        Self {
            engine,
            outbox: Outbox::default(),
            filter: ScheduleFilter::default(),
            port,
        }
    }

    pub fn engine(&self) -> &PlanningEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlanningEngine {
        &mut self.engine
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn filter(&self) -> &ScheduleFilter {
        &self.filter
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Stage one chart gesture. The edit lands in the outbox only; the
    /// engine sees it on the next flush.
    pub fn apply_edit(&mut self, edit: ChartEdit) -> Result<(), EngineError> {
        match edit {
            ChartEdit::Moved {
                task_id,
                planned_start,
            } => {
                let mut update = self.current_update(task_id)?;
                update.planned_start = planned_start;
                self.outbox.stage_update(update)
            }
            ChartEdit::Resized {
                task_id,
                duration_minutes,
            } => {
                let mut update = self.current_update(task_id)?;
                update.duration_minutes = duration_minutes;
                self.outbox.stage_update(update)
            }
            ChartEdit::Reassigned {
                task_id,
                resource_id,
            } => {
                let mut update = self.current_update(task_id)?;
                update.resource_id = resource_id;
                self.outbox.stage_update(update)
            }
            ChartEdit::ProgressChanged { task_id, progress } => {
                let mut update = self.current_update(task_id)?;
                update.progress = progress;
                self.outbox.stage_update(update)
            }
            ChartEdit::Linked {
                predecessor_id,
                successor_id,
            } => self
                .outbox
                .stage_link(DependencyLink::finish_to_start(predecessor_id, successor_id)),
            ChartEdit::Unlinked { link_id } => self.outbox.stage_unlink(link_id),
        }
    }

    pub fn stage_create(&mut self, task: Task) -> Result<(), EngineError> {
        self.outbox.stage_create(task)
    }

    pub fn stage_delete(&mut self, task_id: TaskId) -> Result<(), EngineError> {
        self.outbox.stage_delete(task_id)
    }

    /// Push the outbox to the engine as one atomic delta. A rejected
    /// delta goes back into the outbox so no edit is silently lost.
    pub fn flush(&mut self) -> Result<SyncAck, EngineError> {
        let delta = self.outbox.take_delta();
        if delta.is_empty() {
            return Ok(SyncAck::default());
        }
        match self.engine.apply_sync(&delta) {
            Ok(ack) => {
                self.refresh()?;
                Ok(ack)
            }
            Err(e) => {
                debug!(error = %e, "flush rejected, restoring outbox");
                self.outbox.restore(delta);
                Err(e)
            }
        }
    }

    /// Change the visible window. Pending edits flush first so nothing
    /// staged against the old view is dropped.
    pub fn set_filter(&mut self, filter: ScheduleFilter) -> Result<(), EngineError> {
        self.flush()?;
        self.filter = filter;
        self.refresh()
    }

    pub fn refresh(&mut self) -> Result<(), EngineError> {
        let schedule = self.engine.fetch_schedule(&self.filter)?;
        self.port.render(&schedule);
        Ok(())
    }

    pub fn scroll_to(&mut self, task_id: TaskId) {
        self.port.scroll_to(task_id);
    }

    fn current_update(&self, task_id: TaskId) -> Result<TaskUpdate, EngineError> {
        if let Some(update) = self.outbox.staged_update(task_id) {
            return Ok(update);
        }
        let task = self.engine.require_task(task_id)?;
        Ok(TaskUpdate::from_task(&task))
    }
}
