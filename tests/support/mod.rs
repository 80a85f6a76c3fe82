//! Scoped process environment for integration tests.

use std::env;
use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Restores the touched variables when dropped.
///
/// Holding the guard also holds a process-wide lock, so tests that change
/// the environment never overlap.
pub struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    /// Applies `changes`, where `None` removes the variable.
    pub fn apply(changes: &[(&'static str, Option<&str>)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = changes
            .iter()
            .map(|&(key, value)| {
                let previous = env::var(key).ok();
                set(key, value);
                (key, previous)
            })
            .collect();
        Self { saved, _lock: lock }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..) {
            set(key, previous.as_deref());
        }
    }
}

fn set(key: &str, value: Option<&str>) {
    unsafe {
        // SAFETY: ENV_LOCK serializes environment mutations in tests.
        match value {
            Some(new_value) => env::set_var(key, new_value),
            None => env::remove_var(key),
        }
    }
}
