//! Scheduling domains the orchestrator hops between.
//!
//! The foreground executor is the single ordered sequence presentation state
//! may be touched from. The background executor is a pool of workers keyed by
//! host, used for retrieval work only.
//!
//! Both take boxed tasks. A task an executor decides not to run (because its
//! host was abandoned) must simply be dropped: the orchestrator's tasks
//! release their bookkeeping when dropped.

use hostcycle_contracts::HostKey;

mod inline;
mod manual;
#[cfg(feature = "tokio-runtime")]
mod runtime;
pub(crate) mod trampoline;

pub use inline::InlineExecutor;
pub use manual::ManualExecutor;
#[cfg(feature = "tokio-runtime")]
pub use runtime::{TokioBackground, TokioForeground};

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait ForegroundExecutor: Send + Sync {
    /// Queues `task` on the foreground sequence. Callable from any thread;
    /// tasks submitted from the foreground sequence run in submission order.
    fn submit(&self, key: HostKey, task: Task);

    /// Whether the calling code currently runs on the foreground sequence.
    fn is_current(&self) -> bool;
}

pub trait BackgroundExecutor: Send + Sync {
    /// Runs `task` on some worker. No ordering is guaranteed between tasks.
    fn submit(&self, key: HostKey, task: Task);

    /// Drops every not-yet-started task submitted under `key`.
    fn abandon(&self, key: HostKey);
}
