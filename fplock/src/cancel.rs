//! Cooperative cancellation for long-running device exchanges

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token checked at each enrollment transition boundary
///
/// Cancellation is cooperative: it cannot interrupt an in-flight blocking
/// read, so observation latency is bounded by the per-read timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
