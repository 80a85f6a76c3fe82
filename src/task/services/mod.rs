//! Application services for task lifecycle orchestration.

mod activity;
mod background;
mod cascade;
mod claim;
mod error;
mod lifecycle;
mod retention;

pub use activity::ActivityIndex;
pub use background::{BackgroundJobs, StartMode, run_periodic};
pub use error::{ErrorKind, TaskAction, TaskLifecycleError, TaskLifecycleResult};
pub use lifecycle::{
    CompleteTaskRequest, CreateTaskRequest, DEFAULT_RETENTION, FailTaskRequest,
    TaskLifecycleService,
};
pub use retention::{RetentionSweeper, SweepReport};
