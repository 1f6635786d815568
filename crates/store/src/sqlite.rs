use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rusqlite::Connection;

use planboard_core::{
    calendar::{WeekCalendar, WorkingHours},
    conflict::{Conflict, ConflictKind, Severity},
    delta::{PositionUpdate, TaskUpdate},
    ids::{ConflictId, LinkId, OrderId, ResourceId, TaskId},
    link::{DependencyLink, LinkType},
    resource::{Resource, ResourceKind},
    task::{Order, Task, TaskKind, TaskPriority, TaskStatus},
};

use crate::error::StoreError;
use crate::traits::{ConflictFilter, ScheduleFilter, Store};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StoreError> {
    v.try_into()
        .map_err(|_| StoreError::Serialization(format!("invalid {label} length")))
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        tracing::debug!(path, "opened task store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        tracing::debug!("opened in-memory task store");
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

const TASK_COLUMNS: &str = "task_id, kind, title, planned_start, duration_minutes, resource_id, \
     parent_id, status, priority, progress, order_id, erp_article_no, erp_workplan_no";

fn read_task(row: &rusqlite::Row) -> Result<Task, StoreError> {
    let task_id_bytes: Vec<u8> = row.get(0)?;
    let kind: String = row.get(1)?;
    let title: String = row.get(2)?;
    let planned_start: NaiveDateTime = row.get(3)?;
    let duration_minutes: i64 = row.get(4)?;
    let resource_id_bytes: Option<Vec<u8>> = row.get(5)?;
    let parent_id_bytes: Option<Vec<u8>> = row.get(6)?;
    let status: String = row.get(7)?;
    let priority: String = row.get(8)?;
    let progress: u8 = row.get(9)?;
    let order_id_bytes: Option<Vec<u8>> = row.get(10)?;
    let erp_article_no: Option<String> = row.get(11)?;
    let erp_workplan_no: Option<String> = row.get(12)?;

    let resource_id = match resource_id_bytes {
        Some(b) => Some(ResourceId::from_bytes(to_array::<16>(b, "resource_id")?)),
        None => None,
    };
    let parent_id = match parent_id_bytes {
        Some(b) => Some(TaskId::from_bytes(to_array::<16>(b, "parent_id")?)),
        None => None,
    };
    let order_id = match order_id_bytes {
        Some(b) => Some(OrderId::from_bytes(to_array::<16>(b, "order_id")?)),
        None => None,
    };

    Ok(Task {
        task_id: TaskId::from_bytes(to_array::<16>(task_id_bytes, "task_id")?),
        kind: TaskKind::parse(&kind)?,
        title,
        planned_start,
        duration_minutes,
        resource_id,
        parent_id,
        status: TaskStatus::parse(&status)?,
        priority: TaskPriority::parse(&priority)?,
        progress,
        order_id,
        erp_article_no,
        erp_workplan_no,
    })
}

fn read_link(row: &rusqlite::Row) -> Result<DependencyLink, StoreError> {
    let link_id_bytes: Vec<u8> = row.get(0)?;
    let predecessor_bytes: Vec<u8> = row.get(1)?;
    let successor_bytes: Vec<u8> = row.get(2)?;
    let link_type: String = row.get(3)?;

    Ok(DependencyLink {
        link_id: LinkId::from_bytes(to_array::<16>(link_id_bytes, "link_id")?),
        predecessor_id: TaskId::from_bytes(to_array::<16>(predecessor_bytes, "predecessor_id")?),
        successor_id: TaskId::from_bytes(to_array::<16>(successor_bytes, "successor_id")?),
        link_type: LinkType::parse(&link_type)?,
    })
}

fn read_resource(row: &rusqlite::Row) -> Result<Resource, StoreError> {
    let resource_id_bytes: Vec<u8> = row.get(0)?;
    let kind: String = row.get(1)?;
    let name: String = row.get(2)?;
    let erp_id: String = row.get(3)?;
    let erp_department_id: Option<String> = row.get(4)?;
    let level: u8 = row.get(5)?;
    let capabilities_json: String = row.get(6)?;
    let active: bool = row.get(7)?;

    let capabilities: Vec<String> = serde_json::from_str(&capabilities_json)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(Resource {
        resource_id: ResourceId::from_bytes(to_array::<16>(resource_id_bytes, "resource_id")?),
        kind: ResourceKind::parse(&kind)?,
        name,
        erp_id,
        erp_department_id,
        level,
        capabilities,
        active,
    })
}

fn read_conflict(row: &rusqlite::Row) -> Result<Conflict, StoreError> {
    let conflict_id_bytes: Vec<u8> = row.get(0)?;
    let kind: String = row.get(1)?;
    let severity: String = row.get(2)?;
    let description: String = row.get(3)?;
    let task_id_bytes: Vec<u8> = row.get(4)?;
    let related_bytes: Option<Vec<u8>> = row.get(5)?;
    let resolved: bool = row.get(6)?;
    let detected_at: NaiveDateTime = row.get(7)?;

    let related_task_id = match related_bytes {
        Some(b) => Some(TaskId::from_bytes(to_array::<16>(b, "related_task_id")?)),
        None => None,
    };

    Ok(Conflict {
        conflict_id: ConflictId::from_bytes(to_array::<16>(conflict_id_bytes, "conflict_id")?),
        kind: ConflictKind::parse(&kind)?,
        severity: Severity::parse(&severity)?,
        description,
        task_id: TaskId::from_bytes(to_array::<16>(task_id_bytes, "task_id")?),
        related_task_id,
        resolved,
        detected_at,
    })
}

fn tunnel(e: StoreError) -> rusqlite::Error {
    match e {
        StoreError::Sqlite(sq) => sq,
        other => rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Blob,
            Box::new(OpaqueStoreError(other.to_string())),
        ),
    }
}

impl Store for SqliteStore {
    fn insert_task(&mut self, task: &Task) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO tasks (task_id, kind, title, planned_start, duration_minutes, resource_id, parent_id, status, priority, progress, order_id, erp_article_no, erp_workplan_no)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                task.task_id.as_bytes().as_slice(),
                task.kind.as_str(),
                task.title,
                task.planned_start,
                task.duration_minutes,
                task.resource_id.as_ref().map(|r| r.as_bytes().as_slice()),
                task.parent_id.as_ref().map(|p| p.as_bytes().as_slice()),
                task.status.as_str(),
                task.priority.as_str(),
                task.progress,
                task.order_id.as_ref().map(|o| o.as_bytes().as_slice()),
                task.erp_article_no,
                task.erp_workplan_no,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::ConstraintViolation(format!(
                    "task {} already exists",
                    task.task_id
                )))
            }
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    fn update_task(&mut self, update: &TaskUpdate) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET title = ?1, planned_start = ?2, duration_minutes = ?3, resource_id = ?4, parent_id = ?5, status = ?6, priority = ?7, progress = ?8
             WHERE task_id = ?9",
            rusqlite::params![
                update.title,
                update.planned_start,
                update.duration_minutes,
                update.resource_id.as_ref().map(|r| r.as_bytes().as_slice()),
                update.parent_id.as_ref().map(|p| p.as_bytes().as_slice()),
                update.status.as_str(),
                update.priority.as_str(),
                update.progress,
                update.task_id.as_bytes().as_slice(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("task {}", update.task_id)));
        }
        Ok(())
    }

    fn update_position(&mut self, update: &PositionUpdate) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET planned_start = ?1, duration_minutes = ?2, progress = ?3 WHERE task_id = ?4",
            rusqlite::params![
                update.planned_start,
                update.duration_minutes,
                update.progress,
                update.task_id.as_bytes().as_slice(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("task {}", update.task_id)));
        }
        Ok(())
    }

    fn update_task_start(
        &mut self,
        task_id: TaskId,
        start: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET planned_start = ?1 WHERE task_id = ?2",
            rusqlite::params![start, task_id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }

    fn delete_task(&mut self, task_id: TaskId) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM links WHERE predecessor_id = ?1 OR successor_id = ?1",
            rusqlite::params![task_id.as_bytes().as_slice()],
        )?;
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE task_id = ?1",
            rusqlite::params![task_id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }

    fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1"))?;
        let mut rows = stmt.query_map(
            rusqlite::params![task_id.as_bytes().as_slice()],
            |row| read_task(row).map_err(tunnel),
        )?;
        match rows.next() {
            Some(task) => Ok(Some(task?)),
            None => Ok(None),
        }
    }

    fn all_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY planned_start, task_id"
        ))?;
        let tasks = stmt
            .query_map([], |row| read_task(row).map_err(tunnel))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn tasks_filtered(&self, filter: &ScheduleFilter) -> Result<Vec<Task>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(ref ids) = filter.resource_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let marks = vec!["?"; ids.len()].join(", ");
            clauses.push(format!("resource_id IN ({marks})"));
            for id in ids {
                params.push(rusqlite::types::Value::Blob(id.as_bytes().to_vec()));
            }
        }
        // Window clauses go through datetime() so the comparison holds
        // for both ISO-8601 text forms SQLite stores.
        if let Some(to) = filter.to {
            clauses.push("datetime(planned_start) < datetime(?)".into());
            params.push(rusqlite::types::Value::Text(
                to.format("%Y-%m-%d %H:%M:%S").to_string(),
            ));
        }
        if let Some(from) = filter.from {
            clauses.push(
                "datetime(planned_start, '+' || duration_minutes || ' minutes') > datetime(?)"
                    .into(),
            );
            params.push(rusqlite::types::Value::Text(
                from.format("%Y-%m-%d %H:%M:%S").to_string(),
            ));
        }

        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY planned_start, task_id");

        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                read_task(row).map_err(tunnel)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn insert_link(&mut self, link: &DependencyLink) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO links (link_id, predecessor_id, successor_id, link_type) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                link.link_id.as_bytes().as_slice(),
                link.predecessor_id.as_bytes().as_slice(),
                link.successor_id.as_bytes().as_slice(),
                link.link_type.as_str(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::ConstraintViolation(format!(
                    "duplicate link {} -> {}",
                    link.predecessor_id, link.successor_id
                )))
            }
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    fn delete_link(&mut self, link_id: LinkId) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM links WHERE link_id = ?1",
            rusqlite::params![link_id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("link {link_id}")));
        }
        Ok(())
    }

    fn get_link(&self, link_id: LinkId) -> Result<Option<DependencyLink>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT link_id, predecessor_id, successor_id, link_type FROM links WHERE link_id = ?1",
        )?;
        let mut rows = stmt.query_map(
            rusqlite::params![link_id.as_bytes().as_slice()],
            |row| read_link(row).map_err(tunnel),
        )?;
        match rows.next() {
            Some(link) => Ok(Some(link?)),
            None => Ok(None),
        }
    }

    fn all_links(&self) -> Result<Vec<DependencyLink>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT link_id, predecessor_id, successor_id, link_type FROM links ORDER BY link_id",
        )?;
        let links = stmt
            .query_map([], |row| read_link(row).map_err(tunnel))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    fn upsert_resource(&mut self, resource: &Resource) -> Result<(), StoreError> {
        let capabilities = serde_json::to_string(&resource.capabilities)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO resources (resource_id, kind, name, erp_id, erp_department_id, level, capabilities, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(resource_id) DO UPDATE SET kind = excluded.kind, name = excluded.name,
                 erp_id = excluded.erp_id, erp_department_id = excluded.erp_department_id,
                 level = excluded.level, capabilities = excluded.capabilities, active = excluded.active
             ON CONFLICT(erp_id) DO UPDATE SET kind = excluded.kind, name = excluded.name,
                 erp_department_id = excluded.erp_department_id, level = excluded.level,
                 capabilities = excluded.capabilities, active = excluded.active",
            rusqlite::params![
                resource.resource_id.as_bytes().as_slice(),
                resource.kind.as_str(),
                resource.name,
                resource.erp_id,
                resource.erp_department_id,
                resource.level,
                capabilities,
                resource.active,
            ],
        )?;
        Ok(())
    }

    fn set_resource_active(
        &mut self,
        resource_id: ResourceId,
        active: bool,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE resources SET active = ?1 WHERE resource_id = ?2",
            rusqlite::params![active, resource_id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("resource {resource_id}")));
        }
        Ok(())
    }

    fn get_resource(&self, resource_id: ResourceId) -> Result<Option<Resource>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT resource_id, kind, name, erp_id, erp_department_id, level, capabilities, active
             FROM resources WHERE resource_id = ?1",
        )?;
        let mut rows = stmt.query_map(
            rusqlite::params![resource_id.as_bytes().as_slice()],
            |row| read_resource(row).map_err(tunnel),
        )?;
        match rows.next() {
            Some(resource) => Ok(Some(resource?)),
            None => Ok(None),
        }
    }

    fn resource_by_erp_id(&self, erp_id: &str) -> Result<Option<Resource>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT resource_id, kind, name, erp_id, erp_department_id, level, capabilities, active
             FROM resources WHERE erp_id = ?1",
        )?;
        let mut rows = stmt.query_map(rusqlite::params![erp_id], |row| {
            read_resource(row).map_err(tunnel)
        })?;
        match rows.next() {
            Some(resource) => Ok(Some(resource?)),
            None => Ok(None),
        }
    }

    fn all_resources(&self) -> Result<Vec<Resource>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT resource_id, kind, name, erp_id, erp_department_id, level, capabilities, active
             FROM resources ORDER BY name, resource_id",
        )?;
        let resources = stmt
            .query_map([], |row| read_resource(row).map_err(tunnel))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    fn upsert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO orders (order_id, number, due_date) VALUES (?1, ?2, ?3)
             ON CONFLICT(order_id) DO UPDATE SET number = excluded.number, due_date = excluded.due_date
             ON CONFLICT(number) DO UPDATE SET due_date = excluded.due_date",
            rusqlite::params![
                order.order_id.as_bytes().as_slice(),
                order.number,
                order.due_date,
            ],
        )?;
        Ok(())
    }

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT order_id, number, due_date FROM orders WHERE order_id = ?1")?;
        let mut rows = stmt.query_map(
            rusqlite::params![order_id.as_bytes().as_slice()],
            read_order_row,
        )?;
        match rows.next() {
            Some(order) => Ok(Some(order?)),
            None => Ok(None),
        }
    }

    fn order_by_number(&self, number: &str) -> Result<Option<Order>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT order_id, number, due_date FROM orders WHERE number = ?1")?;
        let mut rows = stmt.query_map(rusqlite::params![number], read_order_row)?;
        match rows.next() {
            Some(order) => Ok(Some(order?)),
            None => Ok(None),
        }
    }

    fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT order_id, number, due_date FROM orders ORDER BY number")?;
        let orders = stmt
            .query_map([], read_order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    fn replace_unresolved_conflicts(&mut self, fresh: &[Conflict]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM conflicts WHERE resolved = 0", [])?;
        for conflict in fresh {
            tx.execute(
                "INSERT INTO conflicts (conflict_id, kind, severity, description, task_id, related_task_id, resolved, detected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    conflict.conflict_id.as_bytes().as_slice(),
                    conflict.kind.as_str(),
                    conflict.severity.as_str(),
                    conflict.description,
                    conflict.task_id.as_bytes().as_slice(),
                    conflict
                        .related_task_id
                        .as_ref()
                        .map(|t| t.as_bytes().as_slice()),
                    conflict.resolved,
                    conflict.detected_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn conflicts(&self, filter: &ConflictFilter) -> Result<Vec<Conflict>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT conflict_id, kind, severity, description, task_id, related_task_id, resolved, detected_at
             FROM conflicts ORDER BY detected_at, conflict_id",
        )?;
        let mut conflicts = stmt
            .query_map([], |row| read_conflict(row).map_err(tunnel))?
            .collect::<Result<Vec<_>, _>>()?;
        conflicts.retain(|c| {
            filter.resolved.is_none_or(|r| c.resolved == r)
                && filter.kind.is_none_or(|k| c.kind == k)
                && filter
                    .task_id
                    .is_none_or(|t| c.task_id == t || c.related_task_id == Some(t))
        });
        Ok(conflicts)
    }

    fn get_conflict(&self, conflict_id: ConflictId) -> Result<Option<Conflict>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT conflict_id, kind, severity, description, task_id, related_task_id, resolved, detected_at
             FROM conflicts WHERE conflict_id = ?1",
        )?;
        let mut rows = stmt.query_map(
            rusqlite::params![conflict_id.as_bytes().as_slice()],
            |row| read_conflict(row).map_err(tunnel),
        )?;
        match rows.next() {
            Some(conflict) => Ok(Some(conflict?)),
            None => Ok(None),
        }
    }

    fn mark_conflict_resolved(&mut self, conflict_id: ConflictId) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE conflicts SET resolved = 1 WHERE conflict_id = ?1",
            rusqlite::params![conflict_id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("conflict {conflict_id}")));
        }
        Ok(())
    }

    fn get_week_calendar(&self) -> Result<WeekCalendar, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT weekday, start_time, end_time, is_working_day FROM working_hours ORDER BY weekday",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let weekday: u8 = row.get(0)?;
                let start: NaiveTime = row.get(1)?;
                let end: NaiveTime = row.get(2)?;
                let is_working_day: bool = row.get(3)?;
                Ok((weekday, start, end, is_working_day))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.len() != 7 {
            // Unconfigured (or partially written) table falls back to the
            // standard week.
            return Ok(WeekCalendar::standard());
        }

        let mut days = *WeekCalendar::standard().days();
        for (weekday, start, end, is_working_day) in rows {
            let wd = Weekday::try_from(weekday)
                .map_err(|_| StoreError::Serialization(format!("bad weekday index {weekday}")))?;
            days[wd.num_days_from_monday() as usize] = WorkingHours {
                weekday: wd,
                start,
                end,
                is_working_day,
            };
        }
        Ok(WeekCalendar::new(days)?)
    }

    fn set_week_calendar(&mut self, calendar: &WeekCalendar) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM working_hours", [])?;
        for day in calendar.days() {
            tx.execute(
                "INSERT INTO working_hours (weekday, start_time, end_time, is_working_day) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    day.weekday.num_days_from_monday() as u8,
                    day.start,
                    day.end,
                    day.is_working_day,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn read_order_row(row: &rusqlite::Row) -> Result<Order, rusqlite::Error> {
    let order_id_bytes: Vec<u8> = row.get(0)?;
    let number: String = row.get(1)?;
    let due_date: NaiveDate = row.get(2)?;
    let order_id = to_array::<16>(order_id_bytes, "order_id")
        .map(OrderId::from_bytes)
        .map_err(tunnel)?;
    Ok(Order {
        order_id,
        number,
        due_date,
    })
}

/// Wrapper error type used to tunnel StoreError through rusqlite's error
/// system in query_map closures that must return rusqlite::Error.
#[derive(Debug)]
struct OpaqueStoreError(String);

impl std::fmt::Display for OpaqueStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OpaqueStoreError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_task(title: &str, start: &str, minutes: i64) -> Task {
        Task {
            task_id: TaskId::new(),
            kind: TaskKind::Operation,
            title: title.into(),
            planned_start: NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M")
                .expect("valid datetime"),
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
    fn task_round_trip() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        let task = sample_task("mill housing", "2026-03-02 09:00", 45);
        store.insert_task(&task).expect("insert");

        let loaded = store.get_task(task.task_id).expect("get").expect("present");
        assert_eq!(loaded, task);
        assert_eq!(
            loaded.planned_end(),
            loaded.planned_start + chrono::Duration::minutes(45)
        );
    }

    #[test]
    fn duplicate_task_id_is_a_constraint_violation() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        let task = sample_task("op", "2026-03-02 09:00", 30);
        store.insert_task(&task).expect("insert");
        assert!(matches!(
            store.insert_task(&task),
            Err(StoreError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn delete_task_cascades_links() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        let a = sample_task("a", "2026-03-02 09:00", 30);
        let b = sample_task("b", "2026-03-02 10:00", 30);
        store.insert_task(&a).expect("insert a");
        store.insert_task(&b).expect("insert b");
        let link = DependencyLink::finish_to_start(a.task_id, b.task_id);
        store.insert_link(&link).expect("link");

        store.delete_task(a.task_id).expect("delete");
        assert!(store.all_links().expect("links").is_empty());
        assert!(store.get_task(b.task_id).expect("get").is_some());
    }

    #[test]
    fn filtered_query_restricts_by_resource_and_window() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        let saw = Resource {
            resource_id: ResourceId::new(),
            kind: ResourceKind::Machine,
            name: "saw".into(),
            erp_id: "M-saw".into(),
            erp_department_id: None,
            level: 3,
            capabilities: vec!["production".into()],
            active: true,
        };
        store.upsert_resource(&saw).expect("resource");

        let mut on_saw = sample_task("on saw", "2026-03-02 09:00", 60);
        on_saw.resource_id = Some(saw.resource_id);
        let mut earlier = sample_task("day before", "2026-03-01 09:00", 60);
        earlier.resource_id = Some(saw.resource_id);
        let unassigned = sample_task("unassigned", "2026-03-02 09:00", 60);
        for task in [&on_saw, &earlier, &unassigned] {
            store.insert_task(task).expect("insert");
        }

        let filter = ScheduleFilter {
            resource_ids: Some(vec![saw.resource_id]),
            from: Some(
                NaiveDateTime::parse_from_str("2026-03-02 00:00", "%Y-%m-%d %H:%M")
                    .expect("valid datetime"),
            ),
            to: Some(
                NaiveDateTime::parse_from_str("2026-03-03 00:00", "%Y-%m-%d %H:%M")
                    .expect("valid datetime"),
            ),
        };
        let tasks = store.tasks_filtered(&filter).expect("query");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "on saw");

        // A task straddling the window's lower edge still intersects it.
        let mut straddles = sample_task("overnight", "2026-03-01 23:30", 60);
        straddles.resource_id = Some(saw.resource_id);
        store.insert_task(&straddles).expect("insert");
        let tasks = store.tasks_filtered(&filter).expect("query");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "overnight");

        let no_rows = store
            .tasks_filtered(&ScheduleFilter {
                resource_ids: Some(Vec::new()),
                from: None,
                to: None,
            })
            .expect("query");
        assert!(no_rows.is_empty());
    }

    #[test]
    fn replace_unresolved_keeps_resolved_rows() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        let task = sample_task("op", "2026-03-02 09:00", 30);
        store.insert_task(&task).expect("insert");

        let now = task.planned_start;
        let first = Conflict::new(
            ConflictKind::Calendar,
            "outside working hours".into(),
            task.task_id,
            None,
            now,
        );
        store
            .replace_unresolved_conflicts(std::slice::from_ref(&first))
            .expect("replace");
        store
            .mark_conflict_resolved(first.conflict_id)
            .expect("resolve");

        // A later wholesale replacement must not delete resolved rows.
        store.replace_unresolved_conflicts(&[]).expect("replace");
        let remaining = store.conflicts(&ConflictFilter::default()).expect("list");
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].resolved);
    }

    #[test]
    fn calendar_defaults_until_configured() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        assert_eq!(
            store.get_week_calendar().expect("get"),
            WeekCalendar::standard()
        );

        let mut days = *WeekCalendar::standard().days();
        days[5].is_working_day = true; // Saturday shift
        let calendar = WeekCalendar::new(days).expect("calendar");
        store.set_week_calendar(&calendar).expect("set");
        assert_eq!(store.get_week_calendar().expect("get"), calendar);
    }

    #[test]
    fn on_disk_store_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.db");
        let path = path.to_str().expect("utf8 path");

        let task = sample_task("persisted", "2026-03-02 09:00", 60);
        {
            let mut store = SqliteStore::open(path).expect("open");
            store.insert_task(&task).expect("insert");
        }
        let store = SqliteStore::open(path).expect("reopen");
        assert!(store.get_task(task.task_id).expect("get").is_some());
    }

    #[test]
    fn order_round_trip() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        let order = Order {
            order_id: OrderId::new(),
            number: "AB-1001".into(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 20).expect("date"),
        };
        store.upsert_order(&order).expect("upsert");
        assert_eq!(
            store.order_by_number("AB-1001").expect("get"),
            Some(order.clone())
        );
        // Upsert by number updates the due date in place.
        let moved = Order {
            due_date: NaiveDate::from_ymd_opt(2026, 3, 27).expect("date"),
            ..order.clone()
        };
        store.upsert_order(&moved).expect("upsert");
        let loaded = store.get_order(order.order_id).expect("get").expect("row");
        assert_eq!(loaded.due_date, moved.due_date);
    }
}
