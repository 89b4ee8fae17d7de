use hostcycle_contracts::HostKey;

use super::{BackgroundExecutor, ForegroundExecutor, Task};

/// Runs every task immediately on the calling thread.
///
/// As a foreground executor it makes whole refresh cycles synchronous, which
/// is what deterministic tests want. As a background executor it never has
/// anything queued, so abandoning is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl ForegroundExecutor for InlineExecutor {
    fn submit(&self, _key: HostKey, task: Task) {
        task();
    }

    fn is_current(&self) -> bool {
        true
    }
}

impl BackgroundExecutor for InlineExecutor {
    fn submit(&self, _key: HostKey, task: Task) {
        task();
    }

    fn abandon(&self, _key: HostKey) {}
}
