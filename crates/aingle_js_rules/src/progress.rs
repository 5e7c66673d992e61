//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Polled by rule evaluation before each focus node.
pub trait ProgressMonitor: Send + Sync {
    /// Returns `true` once the work should stop.
    fn is_canceled(&self) -> bool;
}

/// A shared cancellation switch.
///
/// Clones share the same flag, so one clone can be handed to the engine
/// while another is kept to cancel it.
///
/// ```
/// use aingle_js_rules::{CancellationFlag, ProgressMonitor};
///
/// let flag = CancellationFlag::new();
/// let observer = flag.clone();
/// flag.cancel();
/// assert!(observer.is_canceled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    canceled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.canceled.store(false, Ordering::SeqCst);
    }
}

impl ProgressMonitor for CancellationFlag {
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}
