//! Deterministic executor pumped by hand.
//!
//! Submitted tasks wait in a FIFO queue until the owner pumps them with
//! [`ManualExecutor::run_one`], [`ManualExecutor::run_all`] or
//! [`ManualExecutor::run_until`], which makes interleavings (a host dying
//! between two phases, a refresh storm during retrieval, ...) reproducible.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use hostcycle_contracts::HostKey;
use parking_lot::Mutex;

use super::{BackgroundExecutor, ForegroundExecutor, Task};

const DEFAULT_MAX_ITERATIONS: usize = 10_000;

pub struct ManualExecutor {
    queue: Mutex<VecDeque<(HostKey, Task)>>,
    /// Thread currently pumping, if any.
    pumping: Mutex<Option<ThreadId>>,
    executed: AtomicUsize,
    abandoned: AtomicUsize,
    max_iterations: AtomicUsize,
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending_count())
            .field("executed", &self.executed_count())
            .field("abandoned", &self.abandoned_count())
            .finish()
    }
}

impl Default for ManualExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            pumping: Mutex::new(None),
            executed: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
            max_iterations: AtomicUsize::new(DEFAULT_MAX_ITERATIONS),
        }
    }

    /// Caps `run_all` / `run_until` to catch tasks that resubmit forever.
    pub fn set_max_iterations(&self, max: usize) {
        self.max_iterations.store(max, Ordering::Relaxed);
    }

    /// Runs the oldest queued task. Returns false when the queue was empty.
    pub fn run_one(&self) -> bool {
        // Popped under the lock, run outside of it: tasks submit more work.
        let next = self.queue.lock().pop_front();
        let Some((_key, task)) = next else {
            return false;
        };

        let previous = self.pumping.lock().replace(thread::current().id());
        task();
        *self.pumping.lock() = previous;

        self.executed.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Runs queued tasks, including the ones they submit, until the queue is
    /// empty. Returns how many ran.
    pub fn run_all(&self) -> usize {
        self.run_until(|| false)
    }

    /// Runs queued tasks until `condition` holds or the queue is empty.
    pub fn run_until<F>(&self, mut condition: F) -> usize
    where
        F: FnMut() -> bool,
    {
        let max = self.max_iterations.load(Ordering::Relaxed);
        let mut count = 0;
        while !condition() {
            if count >= max {
                panic!(
                    "ManualExecutor exceeded maximum iterations ({max}). Possible infinite loop?"
                );
            }
            if !self.run_one() {
                break;
            }
            count += 1;
        }
        count
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.queue.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn pending_for(&self, key: HostKey) -> usize {
        self.queue.lock().iter().filter(|(k, _)| *k == key).count()
    }

    pub fn executed_count(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn abandoned_count(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    fn push(&self, key: HostKey, task: Task) {
        self.queue.lock().push_back((key, task));
    }

    fn drop_tasks_of(&self, key: HostKey) {
        let removed: VecDeque<(HostKey, Task)> = {
            let mut queue = self.queue.lock();
            let (removed, kept): (VecDeque<_>, VecDeque<_>) =
                queue.drain(..).partition(|(k, _)| *k == key);
            *queue = kept;
            removed
        };
        self.abandoned.fetch_add(removed.len(), Ordering::SeqCst);
        // Dropping a task may submit new work; the lock is released by now.
        drop(removed);
    }
}

impl ForegroundExecutor for ManualExecutor {
    fn submit(&self, key: HostKey, task: Task) {
        self.push(key, task);
    }

    fn is_current(&self) -> bool {
        *self.pumping.lock() == Some(thread::current().id())
    }
}

impl BackgroundExecutor for ManualExecutor {
    fn submit(&self, key: HostKey, task: Task) {
        self.push(key, task);
    }

    fn abandon(&self, key: HostKey) {
        self.drop_tasks_of(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn counting(counter: &Arc<AtomicUsize>, amount: usize) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(amount, Ordering::SeqCst);
        })
    }

    #[test]
    fn nothing_runs_until_pumped() {
        let executor = ManualExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = HostKey::new();

        BackgroundExecutor::submit(&executor, key, counting(&counter, 1));
        BackgroundExecutor::submit(&executor, key, counting(&counter, 10));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(executor.pending_count(), 2);

        assert_eq!(executor.run_all(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert_eq!(executor.executed_count(), 2);
    }

    #[test]
    fn step_by_step_preserves_submission_order() {
        let executor = Arc::new(ManualExecutor::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let key = HostKey::new();

        for i in 0..3 {
            let order = Arc::clone(&order);
            ForegroundExecutor::submit(
                executor.as_ref(),
                key,
                Box::new(move || order.lock().push(i)),
            );
        }

        executor.run_one();
        assert_eq!(*order.lock(), vec![0]);
        executor.run_one();
        executor.run_one();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(!executor.run_one());
    }

    #[test]
    fn is_current_only_while_pumping() {
        let executor = Arc::new(ManualExecutor::new());
        let observed = Arc::new(AtomicBool::new(false));
        assert!(!executor.is_current());

        let inner = Arc::clone(&executor);
        let seen = Arc::clone(&observed);
        ForegroundExecutor::submit(
            executor.as_ref(),
            HostKey::new(),
            Box::new(move || seen.store(inner.is_current(), Ordering::SeqCst)),
        );
        executor.run_all();

        assert!(observed.load(Ordering::SeqCst));
        assert!(!executor.is_current());
    }

    #[test]
    fn tasks_submitted_while_running_are_picked_up() {
        let executor = Arc::new(ManualExecutor::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let key = HostKey::new();

        let inner = Arc::clone(&executor);
        let follow_up = counting(&counter, 5);
        BackgroundExecutor::submit(
            executor.as_ref(),
            key,
            Box::new(move || BackgroundExecutor::submit(&*inner, key, follow_up)),
        );

        assert_eq!(executor.run_all(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn abandon_drops_only_the_given_key() {
        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let executor = ManualExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let doomed = HostKey::new();
        let survivor = HostKey::new();

        let flag = DropFlag(Arc::clone(&dropped));
        let c = Arc::clone(&counter);
        BackgroundExecutor::submit(
            &executor,
            doomed,
            Box::new(move || {
                let _flag = &flag;
                c.fetch_add(100, Ordering::SeqCst);
            }),
        );
        BackgroundExecutor::submit(&executor, survivor, counting(&counter, 1));
        assert_eq!(executor.pending_for(doomed), 1);

        executor.abandon(doomed);
        assert!(dropped.load(Ordering::SeqCst), "task dropped unrun");
        assert_eq!(executor.abandoned_count(), 1);

        executor.run_all();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "exceeded maximum iterations")]
    fn resubmitting_forever_is_caught() {
        fn resubmit(executor: Arc<ManualExecutor>, key: HostKey) {
            let again = Arc::clone(&executor);
            BackgroundExecutor::submit(
                executor.as_ref(),
                key,
                Box::new(move || resubmit(again, key)),
            );
        }

        let executor = Arc::new(ManualExecutor::new());
        executor.set_max_iterations(10);
        resubmit(Arc::clone(&executor), HostKey::new());
        executor.run_all();
    }
}
