//! # Hostcycle Core
//!
//! Lifecycle-bound refresh orchestration for UI hosts.
//!
//! A host (a screen, or a sub-unit embedded in one) implements the
//! [`Host`](hostcycle_contracts::Host) callback protocol. An [`Orchestrator`]
//! then owns the host's state and drives it through refresh cycles:
//!
//! 1. retrieve the business objects, inline on the foreground sequence or on
//!    the background pool depending on the host's
//!    [`RetrievalPolicy`](hostcycle_contracts::RetrievalPolicy);
//! 2. fulfil the display objects, on the first successful cycle only;
//! 3. synchronize the display objects.
//!
//! At most one cycle runs per host. Requests arriving meanwhile collapse into
//! a single pending slot where the most recent one wins. Once a host is
//! destroyed its work in flight ends silently, and the loading indicator is
//! always balanced.
//!
//! ## Feature Flags
//!
//! - `tokio-runtime` (default): [`TokioForeground`] and [`TokioBackground`]
//!   executors.
//!
//! ## Example
//!
//! ```no_run
//! use hostcycle_contracts::prelude::*;
//! use hostcycle_core::Orchestrator;
//!
//! struct Catalog;
//!
//! impl Host for Catalog {
//!     fn retrieve_display_objects(&self) -> HostResult { Ok(()) }
//!     fn retrieve_business_objects(&self) -> HostResult { Ok(()) }
//!     fn fulfill_display_objects(&self) -> HostResult { Ok(()) }
//!     fn synchronize_display_objects(&self) -> HostResult { Ok(()) }
//! }
//!
//! fn main() -> hostcycle_core::Result<()> {
//!     let orchestrator = Orchestrator::new(Catalog);
//!     orchestrator.on_create(false)?;
//!     orchestrator.on_start()?;
//!     orchestrator.on_resume()?;
//!     assert_eq!(orchestrator.synchronize_count(), 1);
//!     orchestrator.on_pause()?;
//!     orchestrator.on_stop()?;
//!     orchestrator.on_destroy()
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Orchestrator configuration loaded from TOML
pub mod config;
/// Process-wide allocation counters
pub mod diagnostics;
pub mod error;
/// Foreground and background executors
pub mod executor;
pub mod lifecycle;
pub mod orchestrator;
pub mod request;
/// Per-host state container
pub mod state;
/// Tracing subscriber bootstrap
pub mod telemetry;

pub use config::{BackgroundPoolConfig, ImmediatePolicy, OrchestratorConfig};
pub use diagnostics::{OrchestratorStatistics, statistics};
pub use error::{OrchestratorError, Result};
pub use executor::{
    BackgroundExecutor, ForegroundExecutor, InlineExecutor, ManualExecutor,
    Task,
};
#[cfg(feature = "tokio-runtime")]
pub use executor::{TokioBackground, TokioForeground};
pub use lifecycle::LifecyclePhase;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, TracingExceptionSink};
pub use request::{OnComplete, RefreshRequest};
pub use state::{Admission, StateContainer};
