//! The per-host refresh orchestrator.
//!
//! An [`Orchestrator`] owns the [`StateContainer`] of one host, maps the
//! host's lifecycle entry points onto broadcaster events and refresh
//! requests, and drives every refresh cycle across the foreground sequence
//! and the background pool.
//!
//! Work submitted to the executors only holds a weak reference to the
//! orchestrator internals: queued tasks never keep a host alive.

use std::any::type_name;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use hostcycle_contracts::{
    ExceptionSink, Host, HostError, HostKey, HostResult, LifecycleBroadcaster,
    LifecycleEvent, NeverRedirect, NoopBroadcaster, RedirectionAuthority,
};
use tracing::{debug, error, warn};

use crate::config::OrchestratorConfig;
use crate::diagnostics;
use crate::executor::{BackgroundExecutor, ForegroundExecutor, InlineExecutor};
use crate::lifecycle::LifecyclePhase;
use crate::request::{OnComplete, RefreshRequest};
use crate::state::{Admission, StateContainer};

mod cycle;
mod entry_points;

use cycle::Cycle;

/// Fallback exception sink: records the failure at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingExceptionSink;

impl ExceptionSink for TracingExceptionSink {
    fn handle_exception(
        &self,
        key: HostKey,
        error: &HostError,
        from_foreground: bool,
    ) {
        error!(
            target: "hostcycle::refresh",
            host = %key,
            from_foreground,
            error = %error,
            "unhandled host exception"
        );
    }
}

/// Everything a cycle needs, shared between the orchestrator handle and the
/// tasks it hands to the executors.
pub(crate) struct Shared<H: Host> {
    key: HostKey,
    host: Arc<H>,
    state: StateContainer,
    config: OrchestratorConfig,
    foreground: Arc<dyn ForegroundExecutor>,
    background: Arc<dyn BackgroundExecutor>,
    redirection: Arc<dyn RedirectionAuthority>,
    broadcaster: Arc<dyn LifecycleBroadcaster>,
    exception_sink: Arc<dyn ExceptionSink>,
}

impl<H: Host> Drop for Shared<H> {
    fn drop(&mut self) {
        diagnostics::on_released();
    }
}

/// Runs a host hook, converting a panic into [`HostError::Panicked`].
pub(crate) fn guarded<F>(hook: F) -> HostResult
where
    F: FnOnce() -> HostResult,
{
    catch_unwind(AssertUnwindSafe(hook)).unwrap_or_else(|payload| {
        Err(HostError::from_panic(payload))
    })
}

impl<H: Host> Shared<H> {
    /// Alive, and so is the entity owning the host.
    fn is_alive(&self) -> bool {
        self.state.is_alive() && self.host.is_owner_alive()
    }

    fn broadcast(&self, event: LifecycleEvent) {
        self.broadcaster.on_lifecycle_event(self.key, event);
    }

    /// Broadcasts unless the host got redirected or failed to initialize.
    fn broadcast_if_keep_on(&self, event: LifecycleEvent) {
        if self.state.should_keep_on() {
            self.broadcast(event);
        }
    }

    /// Hands `error` to the host, then to the exception sink if the host
    /// declines it or its handler panics.
    fn report(&self, error: HostError, from_foreground: bool) {
        let host = &self.host;
        match catch_unwind(AssertUnwindSafe(|| {
            host.on_exception(error, from_foreground)
        })) {
            Ok(Ok(())) => {}
            Ok(Err(unhandled)) => self.exception_sink.handle_exception(
                self.key,
                &unhandled,
                from_foreground,
            ),
            Err(payload) => {
                let panic = HostError::from_panic(payload);
                error!(
                    target: "hostcycle::refresh",
                    host = %self.key,
                    error = %panic,
                    "exception handler panicked"
                );
                self.exception_sink.handle_exception(
                    self.key,
                    &panic,
                    from_foreground,
                );
            }
        }
    }

    fn notify_loading_started(&self) {
        let host = &self.host;
        if catch_unwind(AssertUnwindSafe(|| host.loading_started())).is_err() {
            warn!(target: "hostcycle::refresh", host = %self.key, "loading_started panicked");
        }
    }

    fn notify_loading_stopped(&self) {
        let host = &self.host;
        if catch_unwind(AssertUnwindSafe(|| host.loading_stopped())).is_err() {
            warn!(target: "hostcycle::refresh", host = %self.key, "loading_stopped panicked");
        }
    }

    /// Admits `request` and starts a cycle for it, or parks it behind the
    /// cycle in flight.
    pub(crate) fn refresh(self: &Arc<Self>, request: RefreshRequest) {
        if !self.is_alive() {
            debug!(
                target: "hostcycle::refresh",
                host = %self.key,
                "ignoring refresh of a dead host"
            );
            return;
        }
        if !self.state.should_keep_on() {
            debug!(
                target: "hostcycle::refresh",
                host = %self.key,
                "ignoring refresh of a redirected or uninitialized host"
            );
            return;
        }

        let request = match self
            .state
            .should_delay_refresh(request, self.config.immediate_policy)
        {
            Admission::Start(request) => request,
            Admission::Delayed => {
                debug!(target: "hostcycle::refresh", host = %self.key, "refresh delayed behind the cycle in flight");
                return;
            }
            Admission::Dropped => {
                debug!(target: "hostcycle::refresh", host = %self.key, "immediate refresh dropped, a cycle is in flight");
                return;
            }
        };

        let cycle = Cycle::new(Arc::downgrade(self), request);
        if self.foreground.is_current() {
            cycle.begin();
        } else {
            self.foreground
                .submit(self.key, Box::new(move || cycle.begin()));
        }
    }
}

/// Drives one host through its lifecycle and refresh cycles.
///
/// Entry points (`on_create`, `on_resume`, ...) are meant to be called from
/// the foreground sequence, in lifecycle order; out-of-order calls are
/// rejected with [`OrchestratorError::InvalidTransition`](crate::OrchestratorError::InvalidTransition).
/// [`Orchestrator::refresh`] may be called from anywhere and never blocks.
pub struct Orchestrator<H: Host> {
    shared: Arc<Shared<H>>,
}

impl<H: Host> fmt::Debug for Orchestrator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("key", &self.shared.key)
            .field("host", &self.shared.host.name())
            .field("phase", &self.shared.state.phase())
            .field("refreshing", &self.shared.state.is_refreshing())
            .field("synchronize_count", &self.shared.state.synchronize_count())
            .finish()
    }
}

impl<H: Host> Orchestrator<H> {
    /// Orchestrator with inline executors and no-op collaborators.
    pub fn new(host: H) -> Self {
        Self::builder(host).build()
    }

    pub fn builder(host: H) -> OrchestratorBuilder<H> {
        OrchestratorBuilder::new(Arc::new(host))
    }

    /// Requests a refresh cycle.
    ///
    /// A no-op for dead hosts. While a cycle is in flight the request takes
    /// the single pending slot, replacing any request already waiting there;
    /// see [`ImmediatePolicy`](crate::ImmediatePolicy) for `immediate`
    /// requests.
    pub fn refresh(
        &self,
        retrieve_business_objects: bool,
        on_complete: Option<OnComplete>,
        immediate: bool,
    ) {
        let mut request =
            RefreshRequest::new(retrieve_business_objects).immediate(immediate);
        request.on_complete = on_complete;
        self.shared.refresh(request);
    }

    /// Submits a prepared request.
    pub fn submit(&self, request: RefreshRequest) {
        self.shared.refresh(request);
    }

    /// Full refresh: retrieval included, no callback, not immediate.
    pub fn refresh_all(&self) {
        self.refresh(true, None, false);
    }

    pub fn refresh_with(&self, retrieve_business_objects: bool) {
        self.refresh(retrieve_business_objects, None, false);
    }

    pub fn key(&self) -> HostKey {
        self.shared.key
    }

    pub fn host(&self) -> &Arc<H> {
        &self.shared.host
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }

    pub fn phase(&self) -> Option<LifecyclePhase> {
        self.shared.state.phase()
    }

    pub fn is_refreshing(&self) -> bool {
        self.shared.state.is_refreshing()
    }

    /// Synchronize phases attempted so far, failed ones included.
    pub fn synchronize_count(&self) -> u64 {
        self.shared.state.synchronize_count()
    }

    /// False when the host is being restored from a saved state.
    pub fn is_first_life_cycle(&self) -> bool {
        self.shared.state.is_first_life_cycle()
    }

    pub fn is_interacting(&self) -> bool {
        self.shared.state.is_interacting()
    }

    pub fn is_alive(&self) -> bool {
        self.shared.state.is_alive()
    }

    pub fn is_redirected(&self) -> bool {
        self.shared.state.is_redirected()
    }

    pub fn should_keep_on(&self) -> bool {
        self.shared.state.should_keep_on()
    }

    pub fn business_objects_retrieved(&self) -> bool {
        self.shared.state.business_objects_retrieved()
    }
}

impl<H: Host> Drop for Orchestrator<H> {
    fn drop(&mut self) {
        self.shared.state.mark_dead();
        self.shared.background.abandon(self.shared.key);
    }
}

/// Wires an [`Orchestrator`] to its executors and collaborators.
///
/// Unset executors default to [`InlineExecutor`]; unset collaborators never
/// redirect, broadcast nothing and log unhandled exceptions.
pub struct OrchestratorBuilder<H: Host> {
    host: Arc<H>,
    key: Option<HostKey>,
    config: OrchestratorConfig,
    foreground: Option<Arc<dyn ForegroundExecutor>>,
    background: Option<Arc<dyn BackgroundExecutor>>,
    redirection: Option<Arc<dyn RedirectionAuthority>>,
    broadcaster: Option<Arc<dyn LifecycleBroadcaster>>,
    exception_sink: Option<Arc<dyn ExceptionSink>>,
}

impl<H: Host> fmt::Debug for OrchestratorBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("host_type", &type_name::<H>())
            .field("key", &self.key)
            .field("config", &self.config)
            .field("foreground_set", &self.foreground.is_some())
            .field("background_set", &self.background.is_some())
            .field("redirection_set", &self.redirection.is_some())
            .field("broadcaster_set", &self.broadcaster.is_some())
            .field("exception_sink_set", &self.exception_sink.is_some())
            .finish()
    }
}

impl<H: Host> OrchestratorBuilder<H> {
    /// Starts from a host that is already shared.
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            key: None,
            config: OrchestratorConfig::default(),
            foreground: None,
            background: None,
            redirection: None,
            broadcaster: None,
            exception_sink: None,
        }
    }

    pub fn with_key(mut self, key: HostKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_foreground(
        mut self,
        executor: Arc<dyn ForegroundExecutor>,
    ) -> Self {
        self.foreground = Some(executor);
        self
    }

    pub fn with_background(
        mut self,
        executor: Arc<dyn BackgroundExecutor>,
    ) -> Self {
        self.background = Some(executor);
        self
    }

    pub fn with_redirection(
        mut self,
        authority: Arc<dyn RedirectionAuthority>,
    ) -> Self {
        self.redirection = Some(authority);
        self
    }

    pub fn with_broadcaster(
        mut self,
        broadcaster: Arc<dyn LifecycleBroadcaster>,
    ) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn with_exception_sink(mut self, sink: Arc<dyn ExceptionSink>) -> Self {
        self.exception_sink = Some(sink);
        self
    }

    pub fn build(self) -> Orchestrator<H> {
        let shared = Shared {
            key: self.key.unwrap_or_default(),
            host: self.host,
            state: StateContainer::new(),
            config: self.config,
            foreground: self
                .foreground
                .unwrap_or_else(|| Arc::new(InlineExecutor)),
            background: self
                .background
                .unwrap_or_else(|| Arc::new(InlineExecutor)),
            redirection: self
                .redirection
                .unwrap_or_else(|| Arc::new(NeverRedirect)),
            broadcaster: self
                .broadcaster
                .unwrap_or_else(|| Arc::new(NoopBroadcaster)),
            exception_sink: self
                .exception_sink
                .unwrap_or_else(|| Arc::new(TracingExceptionSink)),
        };
        diagnostics::on_allocated();
        Orchestrator {
            shared: Arc::new(shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        synchronized: AtomicUsize,
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    impl Host for Counting {
        fn retrieve_display_objects(&self) -> HostResult {
            Ok(())
        }

        fn retrieve_business_objects(&self) -> HostResult {
            Ok(())
        }

        fn fulfill_display_objects(&self) -> HostResult {
            Ok(())
        }

        fn synchronize_display_objects(&self) -> HostResult {
            self.synchronized.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn loading_started(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn loading_stopped(&self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guarded_converts_panics() {
        let error = guarded(|| panic!("hook exploded")).expect_err("panics");
        assert!(error.is_panic());
        assert!(guarded(|| Ok(())).is_ok());
    }

    #[test]
    fn inline_refresh_runs_a_full_cycle() {
        let orchestrator = Orchestrator::new(Counting::default());
        orchestrator.refresh_all();

        let host = orchestrator.host();
        assert_eq!(host.synchronized.load(Ordering::SeqCst), 1);
        assert_eq!(host.started.load(Ordering::SeqCst), 1);
        assert_eq!(host.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.synchronize_count(), 1);
        assert!(orchestrator.business_objects_retrieved());
        assert!(!orchestrator.is_refreshing());
    }

    #[test]
    fn dropping_the_orchestrator_releases_its_internals() {
        let before = diagnostics::statistics();
        let orchestrator = Orchestrator::new(Counting::default());
        assert!(diagnostics::statistics().allocated > before.allocated);
        orchestrator.refresh_all();

        let internals = Arc::downgrade(&orchestrator.shared);
        let host = Arc::clone(orchestrator.host());
        assert_eq!(Arc::strong_count(&host), 2);

        drop(orchestrator);
        assert!(internals.upgrade().is_none());
        assert_eq!(Arc::strong_count(&host), 1);
    }

    /// Fails every synchronize, and its exception handler panics.
    #[derive(Default)]
    struct PanickingHandler;

    impl Host for PanickingHandler {
        fn retrieve_display_objects(&self) -> HostResult {
            Ok(())
        }

        fn retrieve_business_objects(&self) -> HostResult {
            Ok(())
        }

        fn fulfill_display_objects(&self) -> HostResult {
            Ok(())
        }

        fn synchronize_display_objects(&self) -> HostResult {
            Err(HostError::display("stale view"))
        }

        fn on_exception(
            &self,
            _error: HostError,
            _from_foreground: bool,
        ) -> Result<(), HostError> {
            panic!("handler blew up");
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        received: parking_lot::Mutex<Vec<(String, bool)>>,
    }

    impl ExceptionSink for CollectingSink {
        fn handle_exception(
            &self,
            _key: HostKey,
            error: &HostError,
            from_foreground: bool,
        ) {
            self.received
                .lock()
                .push((error.to_string(), from_foreground));
        }
    }

    #[test]
    fn panicking_exception_handler_falls_back_to_the_sink() {
        let sink = Arc::new(CollectingSink::default());
        let orchestrator = Orchestrator::builder(PanickingHandler)
            .with_exception_sink(sink.clone())
            .build();
        orchestrator.refresh_all();

        let received = sink.received.lock().clone();
        assert_eq!(received.len(), 1);
        assert!(received[0].0.contains("handler blew up"), "{received:?}");
        assert!(received[0].1);
        assert!(!orchestrator.is_refreshing());
    }

    #[test]
    fn builder_keeps_the_given_key() {
        let key = HostKey::new();
        let orchestrator =
            Orchestrator::builder(Counting::default()).with_key(key).build();
        assert_eq!(orchestrator.key(), key);
        assert!(format!("{orchestrator:?}").contains("Orchestrator"));
    }
}
