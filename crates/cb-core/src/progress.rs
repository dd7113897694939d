//! Run progress tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback receiving `(current, total)` after each completed record.
pub type ProgressSink = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Thread-safe progress counter over the combined total of both sources.
///
/// The total is fixed up front; `increment` is called concurrently by the
/// workers, once per completed record.
pub struct ProgressTracker {
    current: AtomicU64,
    total: u64,
    sink: Option<ProgressSink>,
}

impl ProgressTracker {
    pub fn new(total: u64, sink: Option<ProgressSink>) -> Self {
        Self {
            current: AtomicU64::new(0),
            total,
            sink,
        }
    }

    /// Records one completed unit of work and notifies the sink.
    pub fn increment(&self) -> u64 {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(sink) = &self.sink {
            sink(current, self.total);
        }
        current
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
