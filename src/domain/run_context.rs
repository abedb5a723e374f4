use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::{Result, SyncError};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Cancellation handle of one sync run.
///
/// Cloned into every per-course task. Only the orchestrator cancels it;
/// everything else just checks it at its checkpoints.
#[derive(Debug, Clone)]
pub struct RunContext {
    id: u64,
    active: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            id: NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// `Err(SyncError::Cancelled)` once the run has been stopped.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SyncError::Cancelled)
        }
    }

    /// Returns true if this call flipped the run from active to cancelled.
    pub fn cancel(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let run = RunContext::new();
        let task_view = run.clone();
        assert!(task_view.ensure_active().is_ok());

        assert!(run.cancel());
        assert!(!run.cancel());
        assert!(!task_view.is_active());
        assert!(task_view.ensure_active().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        assert_ne!(RunContext::new().id(), RunContext::new().id());
    }
}
