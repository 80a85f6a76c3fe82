//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod notifier;
pub mod store;

pub use notifier::{NotifyError, TaskNotification, TaskNotifier};
pub use store::{
    CreatedTaskFilter, TaskStore, TaskStoreError, TaskStoreResult, TaskTransaction,
};
