pub mod autofix;
pub mod conflict;
pub mod error;
pub mod generate;
mod graph;
pub mod outbox;
pub mod port;
pub mod registry;
pub mod shift;
pub mod sync;

pub use autofix::FixReport;
pub use conflict::{CheckReport, ScheduleSnapshot};
pub use error::EngineError;
pub use generate::{ArticleSpec, GenerateReport, OrderSpec, WorkplanStep};
pub use outbox::{Outbox, PlannerSession};
pub use port::{ChartEdit, ChartPort};
pub use registry::{ResourceFilter, ResourceSyncReport};
pub use shift::ShiftRequest;

use planboard_core::{
    calendar::WeekCalendar,
    conflict::Conflict,
    ids::{ConflictId, ResourceId, TaskId},
    link::DependencyLink,
    task::Task,
};
use planboard_store::{ConflictFilter, ScheduleFilter, SqliteStore, Store, StoreError};

/// A filtered view of the plan board: tasks plus the links whose both
/// endpoints are visible.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub tasks: Vec<Task>,
    pub links: Vec<DependencyLink>,
}

pub struct PlanningEngine {
    store: SqliteStore,
}

impl PlanningEngine {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    pub fn open(path: &str) -> Result<Self, EngineError> {
        Ok(Self::new(SqliteStore::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Ok(Self::new(SqliteStore::open_in_memory()?))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SqliteStore {
        &mut self.store
    }

    /// Execute a batch SQL statement on the underlying connection, mapping errors.
    pub(crate) fn exec_batch(&self, sql: &str) -> Result<(), EngineError> {
        self.store
            .conn()
            .execute_batch(sql)
            .map_err(|e| EngineError::Store(StoreError::Sqlite(e)))
    }

    /// Check that a resource exists and is active.
    pub(crate) fn require_live_resource(&self, resource_id: ResourceId) -> Result<(), EngineError> {
        match self.store.get_resource(resource_id)? {
            None => Err(EngineError::ResourceNotFound(resource_id.to_string())),
            Some(r) if !r.active => Err(EngineError::ResourceInactive(resource_id.to_string())),
            Some(_) => Ok(()),
        }
    }

    pub(crate) fn require_task(&self, task_id: TaskId) -> Result<Task, EngineError> {
        self.store
            .get_task(task_id)?
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
    }

    /// Read tasks and links restricted by resource ids and/or a date window.
    pub fn fetch_schedule(&self, filter: &ScheduleFilter) -> Result<Schedule, EngineError> {
        let tasks = self.store.tasks_filtered(filter)?;
        let visible: std::collections::HashSet<TaskId> =
            tasks.iter().map(|t| t.task_id).collect();
        let links = self
            .store
            .all_links()?
            .into_iter()
            .filter(|l| visible.contains(&l.predecessor_id) && visible.contains(&l.successor_id))
            .collect();
        Ok(Schedule { tasks, links })
    }

    pub fn working_hours(&self) -> Result<WeekCalendar, EngineError> {
        Ok(self.store.get_week_calendar()?)
    }

    pub fn set_working_hours(&mut self, calendar: &WeekCalendar) -> Result<(), EngineError> {
        self.store.set_week_calendar(calendar)?;
        Ok(())
    }

    pub fn list_conflicts(&self, filter: &ConflictFilter) -> Result<Vec<Conflict>, EngineError> {
        Ok(self.store.conflicts(filter)?)
    }

    /// Mark one conflict resolved. Resolution suppresses re-surfacing of
    /// the same violation; it never changes the schedule.
    pub fn resolve_conflict(&mut self, conflict_id: ConflictId) -> Result<(), EngineError> {
        let conflict = self
            .store
            .get_conflict(conflict_id)?
            .ok_or_else(|| EngineError::ConflictNotFound(conflict_id.to_string()))?;
        if conflict.resolved {
            return Err(EngineError::ConflictAlreadyResolved(conflict_id.to_string()));
        }
        self.store.mark_conflict_resolved(conflict_id)?;
        Ok(())
    }
}
