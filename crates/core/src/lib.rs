pub mod calendar;
pub mod conflict;
pub mod delta;
pub mod error;
pub mod ids;
pub mod link;
pub mod resource;
pub mod task;

pub use error::CoreError;
