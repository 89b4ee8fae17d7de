//! Process-wide orchestrator counters, for leak hunting only.

use std::sync::atomic::{AtomicUsize, Ordering};

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static ALIVE: AtomicUsize = AtomicUsize::new(0);

/// Snapshot of the process-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrchestratorStatistics {
    /// Orchestrators allocated since the process started.
    pub allocated: usize,
    /// Orchestrators whose internals have not been dropped yet.
    pub alive: usize,
}

pub fn statistics() -> OrchestratorStatistics {
    OrchestratorStatistics {
        allocated: ALLOCATED.load(Ordering::Relaxed),
        alive: ALIVE.load(Ordering::Relaxed),
    }
}

pub(crate) fn on_allocated() {
    ALLOCATED.fetch_add(1, Ordering::Relaxed);
    ALIVE.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn on_released() {
    ALIVE.fetch_sub(1, Ordering::Relaxed);
}
