//! Per-host mutable state shared between the foreground sequence and
//! background workers.

use parking_lot::Mutex;

use crate::config::ImmediatePolicy;
use crate::error::{OrchestratorError, PhaseLabel, Result};
use crate::lifecycle::LifecyclePhase;
use crate::request::RefreshRequest;

/// Outcome of submitting a request to [`StateContainer::should_delay_refresh`].
#[derive(Debug)]
pub enum Admission {
    /// No cycle was running: the container is now marked in flight and the
    /// caller must start a cycle for the returned request.
    Start(RefreshRequest),
    /// A cycle is running; the request now sits in the pending slot.
    Delayed,
    /// A cycle is running and the request was discarded.
    Dropped,
}

#[derive(Debug)]
struct StateInner {
    phase: Option<LifecyclePhase>,
    first_life_cycle: bool,
    redirected: bool,
    alive: bool,
    creation_failed: bool,
    interacting: bool,
    business_objects_retrieved: bool,
    resumed_for_first_time: bool,
    synchronize_count: u64,
    in_flight: bool,
    pending: Option<RefreshRequest>,
}

impl Default for StateInner {
    fn default() -> Self {
        Self {
            phase: None,
            first_life_cycle: true,
            redirected: false,
            alive: true,
            creation_failed: false,
            interacting: false,
            business_objects_retrieved: false,
            resumed_for_first_time: true,
            synchronize_count: 0,
            in_flight: false,
            pending: None,
        }
    }
}

/// Lifecycle flags and refresh bookkeeping of one host, behind a single
/// mutex. Never call out to the host or an executor while holding it.
#[derive(Debug, Default)]
pub struct StateContainer {
    inner: Mutex<StateInner>,
}

impl StateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Option<LifecyclePhase> {
        self.inner.lock().phase
    }

    /// Moves to `to`, rejecting skipped or backwards transitions.
    pub fn advance(&self, to: LifecyclePhase) -> Result<()> {
        let mut inner = self.inner.lock();
        if !LifecyclePhase::accepts(inner.phase, to) {
            return Err(OrchestratorError::InvalidTransition {
                from: PhaseLabel(inner.phase),
                to,
            });
        }
        inner.phase = Some(to);
        Ok(())
    }

    pub fn is_first_life_cycle(&self) -> bool {
        self.inner.lock().first_life_cycle
    }

    pub fn set_first_life_cycle(&self, first: bool) {
        self.inner.lock().first_life_cycle = first;
    }

    pub fn is_redirected(&self) -> bool {
        self.inner.lock().redirected
    }

    /// Sticky: there is no way back once redirected.
    pub fn mark_redirected(&self) {
        self.inner.lock().redirected = true;
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lock().alive
    }

    pub fn mark_dead(&self) {
        self.inner.lock().alive = false;
    }

    pub fn mark_creation_failed(&self) {
        self.inner.lock().creation_failed = true;
    }

    /// False once the host got redirected or failed to initialize.
    pub fn should_keep_on(&self) -> bool {
        let inner = self.inner.lock();
        !inner.redirected && !inner.creation_failed
    }

    pub fn is_interacting(&self) -> bool {
        self.inner.lock().interacting
    }

    pub fn set_interacting(&self, interacting: bool) {
        self.inner.lock().interacting = interacting;
    }

    pub fn business_objects_retrieved(&self) -> bool {
        self.inner.lock().business_objects_retrieved
    }

    pub fn set_business_objects_retrieved(&self) {
        self.inner.lock().business_objects_retrieved = true;
    }

    pub fn is_resumed_for_first_time(&self) -> bool {
        self.inner.lock().resumed_for_first_time
    }

    pub fn mark_not_resumed_for_first_time(&self) {
        self.inner.lock().resumed_for_first_time = false;
    }

    pub fn synchronize_count(&self) -> u64 {
        self.inner.lock().synchronize_count
    }

    /// Counts an attempted synchronize phase and returns the new count.
    pub fn increment_synchronize_count(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.synchronize_count += 1;
        inner.synchronize_count
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().in_flight
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Admits `request` or parks it.
    ///
    /// When no cycle is in flight the container is marked in flight and the
    /// request handed back. Otherwise the request replaces the pending slot,
    /// unless it is `immediate` and `policy` drops busy immediate requests.
    pub fn should_delay_refresh(
        &self,
        request: RefreshRequest,
        policy: ImmediatePolicy,
    ) -> Admission {
        let mut inner = self.inner.lock();
        if !inner.in_flight {
            inner.in_flight = true;
            return Admission::Start(request);
        }
        if request.immediate && policy == ImmediatePolicy::DropWhenBusy {
            return Admission::Dropped;
        }
        // A replaced request is dropped with its callback, outside the lock.
        let replaced = inner.pending.replace(request);
        drop(inner);
        drop(replaced);
        Admission::Delayed
    }

    /// Clears the in-flight mark and hands back the pending request, if any.
    pub fn complete_refresh(&self) -> Option<RefreshRequest> {
        let mut inner = self.inner.lock();
        inner.in_flight = false;
        inner.pending.take()
    }
}
