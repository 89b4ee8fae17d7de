//! Trait surfaces shared by hostcycle hosts and the orchestrator.
//!
//! A *host* is a UI-owning unit (a screen, an activity, a fragment-like
//! sub-unit) whose data retrieval and presentation are driven through the
//! [`Host`](host::Host) callback protocol. The remaining traits describe the
//! process-wide collaborators the orchestrator consults.
#![allow(missing_docs)]

pub mod collaborators;
pub mod error;
pub mod host;
pub mod id;

pub use collaborators::{
    ExceptionSink, LifecycleBroadcaster, LifecycleEvent, NeverRedirect,
    NoopBroadcaster, RedirectionAuthority,
};
pub use error::{HostError, HostResult};
pub use host::{Host, RetrievalPolicy};
pub use id::HostKey;

/// Frequently used items for host implementations.
pub mod prelude {
    pub use super::error::{HostError, HostResult};
    pub use super::host::{Host, RetrievalPolicy};
    pub use super::id::HostKey;
}
