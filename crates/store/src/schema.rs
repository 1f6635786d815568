use rusqlite::Connection;

use crate::error::StoreError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS tasks (
    task_id BLOB PRIMARY KEY CHECK (length(task_id) = 16),
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    planned_start TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
    resource_id BLOB CHECK (resource_id IS NULL OR length(resource_id) = 16),
    parent_id BLOB CHECK (parent_id IS NULL OR length(parent_id) = 16),
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
    order_id BLOB CHECK (order_id IS NULL OR length(order_id) = 16),
    erp_article_no TEXT,
    erp_workplan_no TEXT
);
CREATE INDEX IF NOT EXISTS idx_tasks_resource ON tasks (resource_id, planned_start);
CREATE INDEX IF NOT EXISTS idx_tasks_order ON tasks (order_id);
CREATE INDEX IF NOT EXISTS idx_tasks_start ON tasks (planned_start);

CREATE TABLE IF NOT EXISTS links (
    link_id BLOB PRIMARY KEY CHECK (length(link_id) = 16),
    predecessor_id BLOB NOT NULL CHECK (length(predecessor_id) = 16),
    successor_id BLOB NOT NULL CHECK (length(successor_id) = 16),
    link_type TEXT NOT NULL,
    UNIQUE (predecessor_id, successor_id)
);
CREATE INDEX IF NOT EXISTS idx_links_predecessor ON links (predecessor_id);
CREATE INDEX IF NOT EXISTS idx_links_successor ON links (successor_id);

CREATE TABLE IF NOT EXISTS resources (
    resource_id BLOB PRIMARY KEY CHECK (length(resource_id) = 16),
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    erp_id TEXT NOT NULL UNIQUE,
    erp_department_id TEXT,
    level INTEGER NOT NULL DEFAULT 5 CHECK (level BETWEEN 1 AND 5),
    capabilities TEXT NOT NULL DEFAULT '[]',
    active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_resources_department ON resources (erp_department_id);

CREATE TABLE IF NOT EXISTS orders (
    order_id BLOB PRIMARY KEY CHECK (length(order_id) = 16),
    number TEXT NOT NULL UNIQUE,
    due_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conflicts (
    conflict_id BLOB PRIMARY KEY CHECK (length(conflict_id) = 16),
    kind TEXT NOT NULL,
    severity TEXT NOT NULL,
    description TEXT NOT NULL,
    task_id BLOB NOT NULL CHECK (length(task_id) = 16),
    related_task_id BLOB CHECK (related_task_id IS NULL OR length(related_task_id) = 16),
    resolved INTEGER NOT NULL DEFAULT 0,
    detected_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_conflicts_task ON conflicts (task_id);
CREATE INDEX IF NOT EXISTS idx_conflicts_open ON conflicts (kind) WHERE resolved = 0;

CREATE TABLE IF NOT EXISTS working_hours (
    weekday INTEGER PRIMARY KEY CHECK (weekday BETWEEN 0 AND 6),
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    is_working_day INTEGER NOT NULL
);
";
