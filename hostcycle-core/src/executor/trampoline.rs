//! Per-thread trampoline for cycle restarts.
//!
//! A finished cycle restarts the pending request right away. When executors
//! run inline, that restart happens deep inside the previous cycle's frames,
//! so the restarts are funneled through here: the outermost call on a thread
//! drains a queue, nested calls only enqueue. Stack depth stays bounded no
//! matter how many restarts chain.

use std::cell::RefCell;
use std::collections::VecDeque;

type Deferred = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<Option<VecDeque<Deferred>>> = const { RefCell::new(None) };
}

/// Resets the thread's queue even when a deferred task unwinds.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        QUEUE.with(|cell| *cell.borrow_mut() = None);
    }
}

/// Runs `task` now when no trampoline is active on this thread, otherwise
/// queues it behind the active one.
pub(crate) fn bounce<F>(task: F)
where
    F: FnOnce() + 'static,
{
    let first = QUEUE.with(|cell| {
        let mut cell = cell.borrow_mut();
        match cell.as_mut() {
            Some(queue) => {
                queue.push_back(Box::new(task) as Deferred);
                None
            }
            None => {
                *cell = Some(VecDeque::new());
                Some(task)
            }
        }
    });
    let Some(first) = first else {
        return;
    };

    let _guard = DrainGuard;
    first();
    while let Some(next) = QUEUE.with(|cell| {
        cell.borrow_mut().as_mut().and_then(VecDeque::pop_front)
    }) {
        next();
    }
}
