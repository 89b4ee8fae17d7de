//! Recording host and collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hostcycle_contracts::{
    ExceptionSink, Host, HostError, HostKey, HostResult, LifecycleBroadcaster,
    LifecycleEvent, RetrievalPolicy,
};
use hostcycle_core::{ManualExecutor, Orchestrator, OrchestratorConfig};
use parking_lot::Mutex;

/// Host hooks failures can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    RetrieveDisplayObjects,
    RetrieveBusinessObjects,
    FulfillDisplayObjects,
    SynchronizeDisplayObjects,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RetrieveDisplayObjects,
    RetrieveBusinessObjects,
    BusinessObjectsRetrieved,
    FulfillDisplayObjects,
    SynchronizeDisplayObjects,
    LoadingStarted,
    LoadingStopped,
    OnException {
        message: String,
        from_foreground: bool,
    },
}

impl Call {
    /// Data and presentation hooks only.
    pub fn is_phase_hook(&self) -> bool {
        !matches!(
            self,
            Call::LoadingStarted | Call::LoadingStopped | Call::OnException { .. }
        )
    }
}

#[derive(Debug)]
pub struct RecordingHost {
    policy: RetrievalPolicy,
    sub_unit: bool,
    /// Whether `on_exception` handles errors or hands them to the sink.
    handles_exceptions: bool,
    owner_alive: AtomicBool,
    /// The owner dies while the business objects are being retrieved, and
    /// the retrieval then fails.
    kill_owner_during_retrieval: AtomicBool,
    failures: Mutex<HashSet<Hook>>,
    panics: Mutex<HashSet<Hook>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingHost {
    pub fn new(policy: RetrievalPolicy) -> Self {
        Self {
            policy,
            sub_unit: false,
            handles_exceptions: true,
            owner_alive: AtomicBool::new(true),
            kill_owner_during_retrieval: AtomicBool::new(false),
            failures: Mutex::new(HashSet::new()),
            panics: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn synchronous() -> Self {
        Self::new(RetrievalPolicy::Synchronous)
    }

    pub fn asynchronous() -> Self {
        Self::new(RetrievalPolicy::Asynchronous)
    }

    pub fn sub_unit(mut self) -> Self {
        self.sub_unit = true;
        self
    }

    pub fn declining_exceptions(mut self) -> Self {
        self.handles_exceptions = false;
        self
    }

    pub fn fail(&self, hook: Hook) {
        self.failures.lock().insert(hook);
    }

    pub fn heal(&self, hook: Hook) {
        self.failures.lock().remove(&hook);
    }

    pub fn panic_in(&self, hook: Hook) {
        self.panics.lock().insert(hook);
    }

    pub fn set_owner_alive(&self, alive: bool) {
        self.owner_alive.store(alive, Ordering::SeqCst);
    }

    pub fn kill_owner_during_retrieval(&self) {
        self.kill_owner_during_retrieval.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn phase_hooks(&self) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.is_phase_hook())
            .cloned()
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.lock().iter().filter(|call| *call == wanted).count()
    }

    pub fn exceptions(&self) -> Vec<(String, bool)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::OnException {
                    message,
                    from_foreground,
                } => Some((message.clone(), *from_foreground)),
                _ => None,
            })
            .collect()
    }

    pub fn loading_started(&self) -> usize {
        self.count(&Call::LoadingStarted)
    }

    pub fn loading_stopped(&self) -> usize {
        self.count(&Call::LoadingStopped)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn outcome(&self, hook: Hook) -> HostResult {
        if self.panics.lock().contains(&hook) {
            panic!("{hook:?} panicked");
        }
        if self.failures.lock().contains(&hook) {
            return Err(match hook {
                Hook::RetrieveBusinessObjects => {
                    HostError::unavailable("backend unreachable")
                }
                other => HostError::display(format!("{other:?} failed")),
            });
        }
        Ok(())
    }
}

impl Host for RecordingHost {
    fn name(&self) -> &str {
        "RecordingHost"
    }

    fn retrieval_policy(&self) -> RetrievalPolicy {
        self.policy
    }

    fn retrieve_display_objects(&self) -> HostResult {
        self.record(Call::RetrieveDisplayObjects);
        self.outcome(Hook::RetrieveDisplayObjects)
    }

    fn retrieve_business_objects(&self) -> HostResult {
        self.record(Call::RetrieveBusinessObjects);
        if self.kill_owner_during_retrieval.load(Ordering::SeqCst) {
            self.set_owner_alive(false);
            return Err(HostError::unavailable("owner went away"));
        }
        self.outcome(Hook::RetrieveBusinessObjects)
    }

    fn business_objects_retrieved(&self) -> HostResult {
        self.record(Call::BusinessObjectsRetrieved);
        Ok(())
    }

    fn fulfill_display_objects(&self) -> HostResult {
        self.record(Call::FulfillDisplayObjects);
        self.outcome(Hook::FulfillDisplayObjects)
    }

    fn synchronize_display_objects(&self) -> HostResult {
        self.record(Call::SynchronizeDisplayObjects);
        self.outcome(Hook::SynchronizeDisplayObjects)
    }

    fn on_exception(
        &self,
        error: HostError,
        from_foreground: bool,
    ) -> Result<(), HostError> {
        self.record(Call::OnException {
            message: error.to_string(),
            from_foreground,
        });
        if self.handles_exceptions {
            Ok(())
        } else {
            Err(error)
        }
    }

    fn loading_started(&self) {
        self.record(Call::LoadingStarted);
    }

    fn loading_stopped(&self) {
        self.record(Call::LoadingStopped);
    }

    fn is_owner_alive(&self) -> bool {
        self.owner_alive.load(Ordering::SeqCst)
    }

    fn is_sub_unit(&self) -> bool {
        self.sub_unit
    }
}

#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<LifecycleEvent>>,
    registered: Mutex<Vec<HostKey>>,
    unregistered: Mutex<Vec<HostKey>>,
}

impl RecordingBroadcaster {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    pub fn registered(&self) -> Vec<HostKey> {
        self.registered.lock().clone()
    }

    pub fn unregistered(&self) -> Vec<HostKey> {
        self.unregistered.lock().clone()
    }
}

impl LifecycleBroadcaster for RecordingBroadcaster {
    fn on_lifecycle_event(&self, _key: HostKey, event: LifecycleEvent) {
        self.events.lock().push(event);
    }

    fn register_listeners(&self, key: HostKey) {
        self.registered.lock().push(key);
    }

    fn unregister_listeners(&self, key: HostKey) {
        self.unregistered.lock().push(key);
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<(String, bool)>>,
}

impl RecordingSink {
    pub fn received(&self) -> Vec<(String, bool)> {
        self.received.lock().clone()
    }
}

impl ExceptionSink for RecordingSink {
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

/// An orchestrator wired to manually pumped executors.
pub struct Harness {
    pub foreground: Arc<ManualExecutor>,
    pub background: Arc<ManualExecutor>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub sink: Arc<RecordingSink>,
    pub orchestrator: Orchestrator<RecordingHost>,
}

impl Harness {
    pub fn new(host: RecordingHost) -> Self {
        Self::with_config(host, OrchestratorConfig::default())
    }

    pub fn with_config(host: RecordingHost, config: OrchestratorConfig) -> Self {
        let foreground = Arc::new(ManualExecutor::new());
        let background = Arc::new(ManualExecutor::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let sink = Arc::new(RecordingSink::default());

        let orchestrator = Orchestrator::builder(host)
            .with_config(config)
            .with_foreground(foreground.clone())
            .with_background(background.clone())
            .with_broadcaster(broadcaster.clone())
            .with_exception_sink(sink.clone())
            .build();

        Self {
            foreground,
            background,
            broadcaster,
            sink,
            orchestrator,
        }
    }

    pub fn host(&self) -> &RecordingHost {
        self.orchestrator.host()
    }

    /// Pumps both executors until neither has work left.
    pub fn settle(&self) {
        loop {
            let ran = self.foreground.run_all() + self.background.run_all();
            if ran == 0 {
                break;
            }
        }
    }
}

/// A completion callback appending `label` to `log`.
pub fn logging_callback(
    log: &Arc<Mutex<Vec<&'static str>>>,
    label: &'static str,
) -> hostcycle_core::OnComplete {
    let log = Arc::clone(log);
    Box::new(move || {
        log.lock().push(label);
        Ok(())
    })
}
