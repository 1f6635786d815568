use planboard_core::CoreError;
use planboard_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already exists: {0}")]
    TaskAlreadyExists(String),

    #[error("link not found: {0}")]
    LinkNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("resource is inactive: {0}")]
    ResourceInactive(String),

    #[error("not a department: {0}")]
    NotADepartment(String),

    #[error("conflict not found: {0}")]
    ConflictNotFound(String),

    #[error("conflict already resolved: {0}")]
    ConflictAlreadyResolved(String),

    #[error("dependency cycle detected: {0}")]
    CycleDetected(String),

    #[error("outbox full: {0} pending changes")]
    OutboxFull(usize),
}
