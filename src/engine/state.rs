//! Cooperative run flag shared between the collection worker and the observer.
//!
//! The observer (or a Ctrl+C handler) clears the flag; the worker checks it before every
//! outbound request and before every rate-limit sleep. Calls already in flight finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{CollectError, CollectResult};

#[derive(Debug, Clone)]
pub struct RunState {
    continue_running: Arc<AtomicBool>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            continue_running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.continue_running.load(Ordering::Relaxed)
    }

    /// Ask the worker to stop before its next request. Also set by the controller on completion.
    pub fn request_stop(&self) {
        self.continue_running.store(false, Ordering::Relaxed);
    }

    /// `Err(Cancelled)` once a stop was requested.
    pub fn ensure_running(&self) -> CollectResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(CollectError::Cancelled)
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
