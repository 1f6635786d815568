use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid duration: {minutes} minutes (must be a positive multiple of 15)")]
    InvalidDuration { minutes: i64 },

    #[error("invalid progress: {0} (must be 0..=100)")]
    InvalidProgress(u8),

    #[error("invalid resource level: {0} (must be 1..=5)")]
    InvalidLevel(u8),

    #[error("invalid working hours: {0}")]
    InvalidWorkingHours(String),

    #[error("parse error: {0}")]
    Parse(String),
}
