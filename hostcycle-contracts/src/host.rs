use crate::error::{HostError, HostResult};

/// Where the business objects of a host are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RetrievalPolicy {
    /// Retrieval runs inline on the foreground sequence.
    #[default]
    Synchronous,
    /// Retrieval, and only retrieval, runs on the background pool.
    Asynchronous,
}

impl RetrievalPolicy {
    pub fn is_asynchronous(self) -> bool {
        matches!(self, RetrievalPolicy::Asynchronous)
    }
}

/// The callback protocol a UI-owning entity implements to be driven by an
/// orchestrator.
///
/// Hooks take `&self`: presentation hooks are only ever invoked from the
/// foreground sequence, but retrieval hooks may run on a background worker
/// when [`Host::retrieval_policy`] is [`RetrievalPolicy::Asynchronous`], so
/// implementations keep their mutable state behind interior mutability.
///
/// Call order for one host instance:
///
/// 1. [`retrieve_display_objects`](Host::retrieve_display_objects), once, at
///    creation.
/// 2. Per refresh cycle:
///    [`retrieve_business_objects`](Host::retrieve_business_objects) then
///    [`business_objects_retrieved`](Host::business_objects_retrieved) (both
///    skipped when the cycle does not retrieve),
///    [`fulfill_display_objects`](Host::fulfill_display_objects) (first
///    successful cycle only), then
///    [`synchronize_display_objects`](Host::synchronize_display_objects).
pub trait Host: Send + Sync + 'static {
    /// Human readable name used by logs and the redirection authority.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn retrieval_policy(&self) -> RetrievalPolicy {
        RetrievalPolicy::Synchronous
    }

    /// Grabs the display objects. Foreground, once, at creation.
    fn retrieve_display_objects(&self) -> HostResult;

    /// Loads the business objects. Must not touch presentation state: with
    /// the asynchronous policy it runs on a background worker.
    fn retrieve_business_objects(&self) -> HostResult;

    /// Runs on whichever sequence performed the retrieval.
    fn business_objects_retrieved(&self) -> HostResult {
        Ok(())
    }

    /// Initializes the display objects. Foreground, first cycle only.
    fn fulfill_display_objects(&self) -> HostResult;

    /// Brings the display objects up to date. Foreground, every cycle.
    fn synchronize_display_objects(&self) -> HostResult;

    /// Receives unrecovered failures.
    ///
    /// Returning the error hands it over to the process-wide exception sink;
    /// the default implementation always does.
    fn on_exception(
        &self,
        error: HostError,
        from_foreground: bool,
    ) -> Result<(), HostError> {
        let _ = from_foreground;
        Err(error)
    }

    fn loading_started(&self) {}

    fn loading_stopped(&self) {}

    /// Whether the entity owning this host (the hosting screen of a
    /// sub-unit, for instance) is still around.
    fn is_owner_alive(&self) -> bool {
        true
    }

    /// Sub-units are never redirected: only top-level hosts are.
    fn is_sub_unit(&self) -> bool {
        false
    }
}
