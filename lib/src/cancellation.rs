//! Cooperative cancellation for running exports.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::errors::{ExportError, Result};

#[derive(Debug, Default)]
struct CancellationState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

/// Shared flag plus optional deadline, polled by exporters at row and triple boundaries.
///
/// Clones observe the same state, so the handle can be given to whoever
/// decides to abort (a client disconnect, a timeout watcher) while the export
/// keeps its own copy.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    state: Arc<CancellationState>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that reports cancellation once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        CancellationHandle {
            state: Arc::new(CancellationState {
                cancelled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
            || self.state.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`ExportError::Cancelled`] if the handle was cancelled or timed out.
    pub fn check(&self, location: &str) -> Result<()> {
        if self.state.cancelled.load(Ordering::Acquire) {
            return Err(ExportError::Cancelled(format!(
                "cancelled by request while {}",
                location
            )));
        }
        if let Some(deadline) = self.state.deadline {
            if Instant::now() >= deadline {
                return Err(ExportError::Cancelled(format!(
                    "timeout exceeded while {}",
                    location
                )));
            }
        }
        Ok(())
    }
}
