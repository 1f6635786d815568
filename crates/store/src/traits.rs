use chrono::NaiveDateTime;

use planboard_core::{
    calendar::WeekCalendar,
    conflict::{Conflict, ConflictKind},
    delta::{PositionUpdate, TaskUpdate},
    ids::{ConflictId, LinkId, OrderId, ResourceId, TaskId},
    link::DependencyLink,
    resource::Resource,
    task::{Order, Task},
};

use crate::error::StoreError;

/// Resource/date window restriction for schedule reads. `None` fields do
/// not restrict; the date window intersects with task [start, end).
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub resource_ids: Option<Vec<ResourceId>>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct ConflictFilter {
    pub resolved: Option<bool>,
    pub kind: Option<ConflictKind>,
    pub task_id: Option<TaskId>,
}

/// Seam between the engine and the persisted schedule.
pub trait Store {
    // Tasks
    fn insert_task(&mut self, task: &Task) -> Result<(), StoreError>;
    fn update_task(&mut self, update: &TaskUpdate) -> Result<(), StoreError>;
    fn update_position(&mut self, update: &PositionUpdate) -> Result<(), StoreError>;
    fn update_task_start(&mut self, task_id: TaskId, start: NaiveDateTime)
    -> Result<(), StoreError>;
    /// Deletes the task and every link touching it.
    fn delete_task(&mut self, task_id: TaskId) -> Result<(), StoreError>;
    fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError>;
    fn all_tasks(&self) -> Result<Vec<Task>, StoreError>;
    fn tasks_filtered(&self, filter: &ScheduleFilter) -> Result<Vec<Task>, StoreError>;

    // Links
    fn insert_link(&mut self, link: &DependencyLink) -> Result<(), StoreError>;
    fn delete_link(&mut self, link_id: LinkId) -> Result<(), StoreError>;
    fn get_link(&self, link_id: LinkId) -> Result<Option<DependencyLink>, StoreError>;
    fn all_links(&self) -> Result<Vec<DependencyLink>, StoreError>;

    // Resources
    fn upsert_resource(&mut self, resource: &Resource) -> Result<(), StoreError>;
    fn set_resource_active(&mut self, resource_id: ResourceId, active: bool)
    -> Result<(), StoreError>;
    fn get_resource(&self, resource_id: ResourceId) -> Result<Option<Resource>, StoreError>;
    fn resource_by_erp_id(&self, erp_id: &str) -> Result<Option<Resource>, StoreError>;
    fn all_resources(&self) -> Result<Vec<Resource>, StoreError>;

    // Orders
    fn upsert_order(&mut self, order: &Order) -> Result<(), StoreError>;
    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;
    fn order_by_number(&self, number: &str) -> Result<Option<Order>, StoreError>;
    fn all_orders(&self) -> Result<Vec<Order>, StoreError>;

    // Conflicts
    /// Drops every unresolved conflict and inserts the fresh set in one
    /// transaction; a failure leaves the previous set in place.
    fn replace_unresolved_conflicts(&mut self, fresh: &[Conflict]) -> Result<(), StoreError>;
    fn conflicts(&self, filter: &ConflictFilter) -> Result<Vec<Conflict>, StoreError>;
    fn get_conflict(&self, conflict_id: ConflictId) -> Result<Option<Conflict>, StoreError>;
    fn mark_conflict_resolved(&mut self, conflict_id: ConflictId) -> Result<(), StoreError>;

    // Working calendar
    /// Falls back to the standard week while unconfigured.
    fn get_week_calendar(&self) -> Result<WeekCalendar, StoreError>;
    fn set_week_calendar(&mut self, calendar: &WeekCalendar) -> Result<(), StoreError>;
}
