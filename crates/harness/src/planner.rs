//! A planner fixture wrapping an in-memory engine, plus builders for the
//! domain objects the suites keep constructing.

use chrono::{NaiveDate, NaiveDateTime};

use planboard_core::delta::SyncDelta;
use planboard_core::ids::{LinkId, OrderId, ResourceId, TaskId};
use planboard_core::link::DependencyLink;
use planboard_core::resource::{Resource, ResourceKind};
use planboard_core::task::{Order, Task, TaskKind, TaskPriority, TaskStatus};
use planboard_engine::{ChartPort, PlanningEngine, Schedule};
use planboard_store::Store;

type Error = Box<dyn std::error::Error>;

/// Parse a `%Y-%m-%d %H:%M` literal.
pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").expect("datetime literal")
}

/// Parse a `%Y-%m-%d` literal.
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date literal")
}

/// An unassigned operation task starting at `start`.
pub fn operation(title: &str, start: &str, minutes: i64) -> Task {
    Task {
        task_id: TaskId::new(),
        kind: TaskKind::Operation,
        title: title.into(),
        planned_start: dt(start),
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

pub struct TestPlanner {
    pub engine: PlanningEngine,
}

impl TestPlanner {
    pub fn new() -> Result<Self, Error> {
        crate::init_tracing();
        Ok(Self {
            engine: PlanningEngine::open_in_memory()?,
        })
    }

    /// A planner over an on-disk database, for persistence tests.
    pub fn open(path: &str) -> Result<Self, Error> {
        crate::init_tracing();
        Ok(Self {
            engine: PlanningEngine::open(path)?,
        })
    }

    /// Create one unassigned task through the sync path.
    pub fn add_task(&mut self, title: &str, start: &str, minutes: i64) -> Result<TaskId, Error> {
        let task = operation(title, start, minutes);
        let id = task.task_id;
        self.apply_created(task)?;
        Ok(id)
    }

    /// Create one task assigned to `resource` through the sync path.
    pub fn add_task_on(
        &mut self,
        title: &str,
        start: &str,
        minutes: i64,
        resource: ResourceId,
    ) -> Result<TaskId, Error> {
        let mut task = operation(title, start, minutes);
        task.resource_id = Some(resource);
        let id = task.task_id;
        self.apply_created(task)?;
        Ok(id)
    }

    /// Create one task belonging to `order` through the sync path.
    pub fn add_task_for_order(
        &mut self,
        title: &str,
        start: &str,
        minutes: i64,
        order: OrderId,
    ) -> Result<TaskId, Error> {
        let mut task = operation(title, start, minutes);
        task.order_id = Some(order);
        let id = task.task_id;
        self.apply_created(task)?;
        Ok(id)
    }

    fn apply_created(&mut self, task: Task) -> Result<(), Error> {
        self.engine.apply_sync(&SyncDelta {
            created_tasks: vec![task],
            ..SyncDelta::default()
        })?;
        Ok(())
    }

    /// Link two tasks finish-to-start through the sync path.
    pub fn link(&mut self, predecessor: TaskId, successor: TaskId) -> Result<LinkId, Error> {
        let link = DependencyLink::finish_to_start(predecessor, successor);
        let id = link.link_id;
        self.engine.apply_sync(&SyncDelta {
            created_links: vec![link],
            ..SyncDelta::default()
        })?;
        Ok(id)
    }

    /// Register a department directly in the store.
    pub fn department(&mut self, name: &str, erp_id: &str) -> Result<ResourceId, Error> {
        let resource = Resource {
            resource_id: ResourceId::new(),
            kind: ResourceKind::Department,
            name: name.into(),
            erp_id: erp_id.into(),
            erp_department_id: None,
            level: 1,
            capabilities: Vec::new(),
            active: true,
        };
        let id = resource.resource_id;
        self.engine.store_mut().upsert_resource(&resource)?;
        Ok(id)
    }

    /// Register a machine belonging to a department.
    pub fn machine(
        &mut self,
        name: &str,
        department_erp_id: &str,
        capabilities: &[&str],
    ) -> Result<ResourceId, Error> {
        let resource = Resource {
            resource_id: ResourceId::new(),
            kind: ResourceKind::Machine,
            name: name.into(),
            erp_id: format!("M-{name}"),
            erp_department_id: Some(department_erp_id.into()),
            level: 1,
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            active: true,
        };
        let id = resource.resource_id;
        self.engine.store_mut().upsert_resource(&resource)?;
        Ok(id)
    }

    /// Register an order due at the end of `due`.
    pub fn order(&mut self, number: &str, due: &str) -> Result<OrderId, Error> {
        let order = Order {
            order_id: OrderId::new(),
            number: number.into(),
            due_date: date(due),
        };
        let id = order.order_id;
        self.engine.store_mut().upsert_order(&order)?;
        Ok(id)
    }

    /// Fetch a task that must exist.
    pub fn task(&self, task_id: TaskId) -> Result<Task, Error> {
        Ok(self
            .engine
            .store()
            .get_task(task_id)?
            .ok_or_else(|| format!("task {task_id} missing"))?)
    }
}

/// Chart double that records what the session pushed at it.
#[derive(Default)]
pub struct RecordingPort {
    pub rendered: Vec<Schedule>,
    pub scrolls: Vec<TaskId>,
}

impl ChartPort for RecordingPort {
    fn render(&mut self, schedule: &Schedule) {
        self.rendered.push(schedule.clone());
    }

    fn scroll_to(&mut self, task_id: TaskId) {
        self.scrolls.push(task_id);
    }
}
