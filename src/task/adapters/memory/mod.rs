//! In-memory adapters for the task ports, used by tests and local runs.

mod notifier;
mod store;

pub use notifier::RecordingNotifier;
pub use store::InMemoryTaskStore;
