//! jobloop-scheduler: job registry over the host-scheduler boundary.
//!
//! Schedules are translated to trigger primitives ([`translate`]), job
//! metadata travels in the task's free-text description field ([`envelope`]),
//! and [`registry::JobRegistry`] composes both over a pluggable
//! [`backend::TaskBackend`].

pub mod backend;
pub mod envelope;
pub mod registry;
pub mod translate;
pub mod trigger;

pub use backend::{DirBackend, MemoryBackend, TaskBackend, TaskDefinition};
pub use envelope::{Envelope, decode, encode, is_ours};
pub use registry::JobRegistry;
pub use translate::{from_triggers, to_triggers};
pub use trigger::{Repetition, Trigger};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("job name must not be empty")]
    EmptyJobName,
    #[error("invalid schedule: {0}")]
    InvalidSchedule(#[from] jobloop_types::schedule::ScheduleError),
    #[error("task '{0}' not found")]
    TaskNotFound(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task file error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
