//! Domain model for hierarchical agent tasks.
//!
//! The domain owns the status state machine, task construction rules and
//! credential validation. Persistence, notification and scheduling stay
//! outside of the domain boundary.

mod credentials;
mod error;
mod ids;
mod stats;
mod status;
mod task;

pub use credentials::{Credentials, ServiceCredentials};
pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::{ActorId, TaskId};
pub use stats::{StatsPeriod, StatsWindow, TaskStats};
pub use status::TaskStatus;
pub use task::{FAILURE_REASON_PREFIX, PersistedTaskData, Task, TaskDraft, TaskSummary};
