//! One refresh cycle: retrieval, first-time fulfil, synchronize.
//!
//! A [`Cycle`] is created once a request was admitted and travels, by value,
//! through every task of the cycle. Dropping it ends the cycle: whichever
//! way that happens (success, a failed phase, a dead host, a task the
//! background executor abandoned unrun) the drop stops the loading indicator
//! if it was started and restarts the pending request, if any.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use hostcycle_contracts::{Host, HostError, LifecycleEvent};
use tracing::{debug, error};

use super::{Shared, guarded};
use crate::executor::trampoline;
use crate::request::{OnComplete, RefreshRequest};

pub(crate) struct Cycle<H: Host> {
    shared: Weak<Shared<H>>,
    retrieve: bool,
    on_complete: Option<OnComplete>,
    /// `loading_started` fired and `loading_stopped` is still owed.
    loading: bool,
}

impl<H: Host> Cycle<H> {
    pub(crate) fn new(shared: Weak<Shared<H>>, request: RefreshRequest) -> Self {
        Self {
            shared,
            retrieve: request.retrieve_business_objects,
            on_complete: request.on_complete,
            loading: false,
        }
    }

    /// Foreground. Starts loading, then retrieves inline or hands retrieval
    /// to the background pool.
    pub(crate) fn begin(mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if !shared.is_alive() {
            return;
        }
        if !shared.state.should_keep_on() {
            debug!(
                target: "hostcycle::refresh",
                host = %shared.key,
                "host redirected before its cycle started"
            );
            return;
        }

        self.loading = true;
        shared.notify_loading_started();

        if shared.host.retrieval_policy().is_asynchronous() {
            let background = Arc::clone(&shared.background);
            let key = shared.key;
            drop(shared);
            background.submit(key, Box::new(move || self.run_background()));
        } else if shared.retrieve_phase(self.retrieve, true) {
            shared.present(&mut self);
        }
    }

    /// Background worker.
    fn run_background(self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if !shared.retrieve_phase(self.retrieve, false) {
            return;
        }

        let foreground = Arc::clone(&shared.foreground);
        let key = shared.key;
        drop(shared);
        foreground.submit(key, Box::new(move || self.run_presentation()));
    }

    /// Foreground, after the hop back from the background pool.
    fn run_presentation(mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if !shared.is_alive() {
            debug!(
                target: "hostcycle::refresh",
                host = %shared.key,
                "host died during retrieval, skipping presentation"
            );
            return;
        }
        if !shared.state.should_keep_on() {
            debug!(
                target: "hostcycle::refresh",
                host = %shared.key,
                "host redirected during retrieval, skipping presentation"
            );
            return;
        }
        shared.present(&mut self);
    }

    fn stop_loading(&mut self, shared: &Shared<H>) {
        if std::mem::take(&mut self.loading) {
            shared.notify_loading_stopped();
        }
    }
}

impl<H: Host> Drop for Cycle<H> {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let loading = std::mem::take(&mut self.loading);

        if shared.foreground.is_current() {
            shared.finish_cycle(loading);
        } else {
            let weak = Weak::clone(&self.shared);
            shared.foreground.submit(
                shared.key,
                Box::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.finish_cycle(loading);
                    }
                }),
            );
        }
    }
}

impl<H: Host> Shared<H> {
    /// Retrieval phase, on whichever sequence calls it. Returns whether the
    /// cycle goes on.
    fn retrieve_phase(&self, retrieve: bool, on_foreground: bool) -> bool {
        if retrieve {
            let outcome = guarded(|| {
                if !self.is_alive() {
                    return Ok(());
                }
                self.host.retrieve_business_objects()?;
                if !self.is_alive() {
                    return Ok(());
                }
                self.host.business_objects_retrieved()
            });

            if let Err(error) = outcome {
                if !self.is_alive() {
                    debug!(
                        target: "hostcycle::refresh",
                        host = %self.key,
                        error = %error,
                        "discarding retrieval failure of a dead host"
                    );
                    return false;
                }
                error!(
                    target: "hostcycle::refresh",
                    host = %self.key,
                    on_foreground,
                    error = %error,
                    "cannot retrieve the business objects"
                );
                self.report(error, on_foreground);
                return false;
            }
        }

        if !self.is_alive() {
            return false;
        }
        self.state.set_business_objects_retrieved();
        true
    }

    /// Fulfil (first successful cycle only) and synchronize. Foreground.
    fn present(&self, cycle: &mut Cycle<H>) {
        if self.state.is_resumed_for_first_time() {
            if let Err(error) = guarded(|| self.host.fulfill_display_objects())
            {
                cycle.stop_loading(self);
                self.report(error, true);
                return;
            }
            self.broadcast(LifecycleEvent::FulfillDisplayObjectsDone);
        }

        let count = self.state.increment_synchronize_count();
        let outcome = guarded(|| self.host.synchronize_display_objects());
        cycle.stop_loading(self);
        if let Err(error) = outcome {
            self.report(error, true);
            return;
        }

        debug!(
            target: "hostcycle::refresh",
            host = %self.key,
            count,
            "display objects synchronized"
        );
        self.broadcast(LifecycleEvent::SynchronizeDisplayObjectsDone);
        self.state.mark_not_resumed_for_first_time();

        if let Some(on_complete) = cycle.on_complete.take() {
            self.run_on_complete(on_complete);
        }
    }

    fn run_on_complete(&self, on_complete: OnComplete) {
        match catch_unwind(AssertUnwindSafe(on_complete)) {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => error!(
                target: "hostcycle::refresh",
                host = %self.key,
                error = %format!("{failure:#}"),
                "completion callback failed"
            ),
            Err(payload) => error!(
                target: "hostcycle::refresh",
                host = %self.key,
                error = %HostError::from_panic(payload),
                "completion callback panicked"
            ),
        }
    }

    /// Foreground. Settles the loading indicator, frees the in-flight slot
    /// and restarts the pending request.
    fn finish_cycle(self: &Arc<Self>, loading: bool) {
        if loading {
            self.notify_loading_stopped();
        }
        if let Some(next) = self.state.complete_refresh() {
            let weak = Arc::downgrade(self);
            trampoline::bounce(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.refresh(next);
                }
            });
        }
    }
}
