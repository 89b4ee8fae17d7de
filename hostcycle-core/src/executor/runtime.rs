//! Tokio-backed executors.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use hostcycle_contracts::HostKey;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{BackgroundExecutor, ForegroundExecutor, Task};
use crate::config::BackgroundPoolConfig;

static NEXT_SEQUENCE_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static CURRENT_SEQUENCE: u64;
}

/// A single tokio task draining an unbounded queue: one ordered sequence.
///
/// Cloning yields another handle onto the same sequence. The sequence ends
/// once every handle is dropped and the queue is drained.
#[derive(Clone)]
pub struct TokioForeground {
    id: u64,
    sender: mpsc::UnboundedSender<(HostKey, Task)>,
}

impl fmt::Debug for TokioForeground {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioForeground")
            .field("id", &self.id)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl TokioForeground {
    /// Spawns the sequence on `handle`.
    pub fn spawn(handle: &Handle) -> (Self, JoinHandle<()>) {
        let id = NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, mut receiver) = mpsc::unbounded_channel::<(HostKey, Task)>();

        let join = handle.spawn(CURRENT_SEQUENCE.scope(id, async move {
            while let Some((key, task)) = receiver.recv().await {
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    warn!(
                        target: "hostcycle::executor",
                        host = %key,
                        "foreground task panicked"
                    );
                }
            }
            debug!(target: "hostcycle::executor", sequence = id, "foreground sequence closed");
        }));

        (Self { id, sender }, join)
    }

    /// Spawns the sequence on the ambient runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn_current() -> (Self, JoinHandle<()>) {
        Self::spawn(&Handle::current())
    }
}

impl ForegroundExecutor for TokioForeground {
    fn submit(&self, key: HostKey, task: Task) {
        if self.sender.send((key, task)).is_err() {
            // The returned task is dropped here, releasing its bookkeeping.
            warn!(
                target: "hostcycle::executor",
                host = %key,
                "foreground sequence closed; dropping task"
            );
        }
    }

    fn is_current(&self) -> bool {
        CURRENT_SEQUENCE
            .try_with(|current| *current == self.id)
            .unwrap_or(false)
    }
}

/// Blocking worker pool with at most `max_workers` tasks running at once.
///
/// Every host key owns a cancellation token; [`BackgroundExecutor::abandon`]
/// cancels it so that tasks still waiting for a worker are dropped unrun.
/// Tasks already running are left alone: they observe the host's death
/// through its aliveness flag.
#[derive(Clone)]
pub struct TokioBackground {
    handle: Handle,
    permits: Arc<Semaphore>,
    max_workers: usize,
    tokens: Arc<DashMap<HostKey, CancellationToken>>,
}

impl fmt::Debug for TokioBackground {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioBackground")
            .field("max_workers", &self.max_workers)
            .field("available_permits", &self.permits.available_permits())
            .field("tracked_hosts", &self.tokens.len())
            .finish()
    }
}

impl TokioBackground {
    pub fn new(handle: Handle, config: &BackgroundPoolConfig) -> Self {
        let max_workers = config.max_workers.max(1);
        Self {
            handle,
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            tokens: Arc::new(DashMap::new()),
        }
    }

    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn with_current(config: &BackgroundPoolConfig) -> Self {
        Self::new(Handle::current(), config)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn token_for(&self, key: HostKey) -> CancellationToken {
        self.tokens
            .entry(key)
            .or_insert_with(CancellationToken::new)
            .clone()
    }
}

impl BackgroundExecutor for TokioBackground {
    fn submit(&self, key: HostKey, task: Task) {
        let token = self.token_for(key);
        let permits = Arc::clone(&self.permits);

        self.handle.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                debug!(target: "hostcycle::executor", host = %key, "dropping abandoned background task");
                return;
            };
            if token.is_cancelled() {
                debug!(target: "hostcycle::executor", host = %key, "dropping abandoned background task");
                return;
            }

            let outcome = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                catch_unwind(AssertUnwindSafe(task)).is_ok()
            })
            .await;
            if !matches!(outcome, Ok(true)) {
                warn!(
                    target: "hostcycle::executor",
                    host = %key,
                    "background task panicked"
                );
            }
        });
    }

    fn abandon(&self, key: HostKey) {
        if let Some((_, token)) = self.tokens.remove(&key) {
            token.cancel();
        }
    }
}
