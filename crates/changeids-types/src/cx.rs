//! Cancellation context threaded through an extraction run.
//!
//! Cancellation is cooperative: the driver calls [`Cx::checkpoint`] between
//! change-set files, never in the middle of merging one file's records.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use changeids_error::{ChangeIdsError, Result};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Cx {
    cancelled: Arc<AtomicBool>,
}

impl Cx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone of this context observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ChangeIdsError::Interrupted);
        }
        Ok(())
    }

    pub fn checkpoint_with(&self, msg: &str) -> Result<()> {
        self.checkpoint().inspect_err(|_| {
            debug!(checkpoint = msg, "cancellation observed");
        })
    }
}
