use crate::error::HostError;
use crate::id::HostKey;

/// Observable points of a host's life, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LifecycleEvent {
    /// Emitted before the redirection check, even for redirected hosts.
    SuperCreateBefore,
    Create,
    CreateDone,
    PostCreate,
    ContentChanged,
    Start,
    Restart,
    Resume,
    PostResume,
    FulfillDisplayObjectsDone,
    SynchronizeDisplayObjectsDone,
    Pause,
    Stop,
    Destroy,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::SuperCreateBefore => "super_create_before",
            LifecycleEvent::Create => "create",
            LifecycleEvent::CreateDone => "create_done",
            LifecycleEvent::PostCreate => "post_create",
            LifecycleEvent::ContentChanged => "content_changed",
            LifecycleEvent::Start => "start",
            LifecycleEvent::Restart => "restart",
            LifecycleEvent::Resume => "resume",
            LifecycleEvent::PostResume => "post_resume",
            LifecycleEvent::FulfillDisplayObjectsDone => {
                "fulfill_display_objects_done"
            }
            LifecycleEvent::SynchronizeDisplayObjectsDone => {
                "synchronize_display_objects_done"
            }
            LifecycleEvent::Pause => "pause",
            LifecycleEvent::Stop => "stop",
            LifecycleEvent::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide authority deciding whether a host must be diverted elsewhere
/// before its normal initialization (login gate, onboarding, ...).
pub trait RedirectionAuthority: Send + Sync {
    fn needs_redirection(&self, key: HostKey, host_name: &str) -> bool;
}

/// Purely observational listener of lifecycle events. Implementations must
/// not try to steer the host from these callbacks.
pub trait LifecycleBroadcaster: Send + Sync {
    fn on_lifecycle_event(&self, key: HostKey, event: LifecycleEvent);

    /// Called once the host is past the redirection check.
    fn register_listeners(&self, key: HostKey) {
        let _ = key;
    }

    /// Called on teardown for hosts that registered.
    fn unregister_listeners(&self, key: HostKey) {
        let _ = key;
    }
}

/// Global fallback for failures the host's own handler declined.
pub trait ExceptionSink: Send + Sync {
    fn handle_exception(
        &self,
        key: HostKey,
        error: &HostError,
        from_foreground: bool,
    );
}

/// Authority that never redirects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRedirect;

impl RedirectionAuthority for NeverRedirect {
    fn needs_redirection(&self, _key: HostKey, _host_name: &str) -> bool {
        false
    }
}

/// Broadcaster that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcaster;

impl LifecycleBroadcaster for NoopBroadcaster {
    fn on_lifecycle_event(&self, _key: HostKey, _event: LifecycleEvent) {}
}

impl<T: RedirectionAuthority + ?Sized> RedirectionAuthority
    for std::sync::Arc<T>
{
    fn needs_redirection(&self, key: HostKey, host_name: &str) -> bool {
        (**self).needs_redirection(key, host_name)
    }
}

impl<T: LifecycleBroadcaster + ?Sized> LifecycleBroadcaster
    for std::sync::Arc<T>
{
    fn on_lifecycle_event(&self, key: HostKey, event: LifecycleEvent) {
        (**self).on_lifecycle_event(key, event)
    }

    fn register_listeners(&self, key: HostKey) {
        (**self).register_listeners(key)
    }

    fn unregister_listeners(&self, key: HostKey) {
        (**self).unregister_listeners(key)
    }
}

impl<T: ExceptionSink + ?Sized> ExceptionSink for std::sync::Arc<T> {
    fn handle_exception(
        &self,
        key: HostKey,
        error: &HostError,
        from_foreground: bool,
    ) {
        (**self).handle_exception(key, error, from_foreground)
    }
}
