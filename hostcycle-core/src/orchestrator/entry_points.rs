//! Lifecycle entry points.
//!
//! Every entry point validates the phase transition first, then emits its
//! broadcaster event. Events are only emitted while the host should keep on
//! (not redirected, initialized), `SuperCreateBefore` excepted.

use hostcycle_contracts::{Host, LifecycleEvent};
use tracing::{debug, info, warn};

use super::{Orchestrator, guarded};
use crate::error::{OrchestratorError, Result};
use crate::lifecycle::LifecyclePhase;
use crate::request::RefreshRequest;

impl<H: Host> Orchestrator<H> {
    fn trace_entry(&self, entry: &'static str) {
        if self.shared.config.lifecycle_debug_logs {
            debug!(
                target: "hostcycle::lifecycle",
                host = %self.shared.key,
                name = self.shared.host.name(),
                entry,
                "lifecycle entry point"
            );
        }
    }

    fn advance(&self, to: LifecyclePhase) -> Result<()> {
        self.shared.state.advance(to).inspect_err(|error| {
            warn!(
                target: "hostcycle::lifecycle",
                host = %self.shared.key,
                error = %error,
                "rejected lifecycle transition"
            );
        })
    }

    fn ensure_not_destroyed(&self) -> Result<()> {
        if self.shared.state.phase() == Some(LifecyclePhase::Destroyed) {
            return Err(OrchestratorError::Destroyed(
                self.shared.host.name().to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a top-level host must be diverted. Sub-units never are.
    fn check_redirection(&self) -> bool {
        let shared = &self.shared;
        if shared.host.is_sub_unit() {
            return false;
        }
        if !shared
            .redirection
            .needs_redirection(shared.key, shared.host.name())
        {
            return false;
        }
        shared.state.mark_redirected();
        info!(
            target: "hostcycle::lifecycle",
            host = %shared.key,
            name = shared.host.name(),
            "host redirected, skipping its initialization"
        );
        true
    }

    /// Same parameters as a resume: retrieve only what was never retrieved.
    fn refresh_like_resume(&self) {
        let retrieve = !self.shared.state.business_objects_retrieved();
        self.shared
            .refresh(RefreshRequest::new(retrieve).immediate(true));
    }

    /// Creation. `restored` tells a host rebuilt from a saved state apart
    /// from a fresh one.
    ///
    /// A failing `retrieve_display_objects` is reported to the exception
    /// path and stops all further processing for this host; it is not an
    /// error of this call.
    pub fn on_create(&self, restored: bool) -> Result<()> {
        self.trace_entry("on_create");
        self.advance(LifecyclePhase::Created)?;
        let shared = &self.shared;

        shared.broadcast(LifecycleEvent::SuperCreateBefore);
        if self.check_redirection() {
            return Ok(());
        }

        shared.broadcast(LifecycleEvent::Create);
        shared.state.set_first_life_cycle(!restored);
        shared.broadcaster.register_listeners(shared.key);

        if !shared.foreground.is_current() {
            warn!(
                target: "hostcycle::lifecycle",
                host = %shared.key,
                "on_create called off the foreground sequence"
            );
        }
        if let Err(error) = guarded(|| shared.host.retrieve_display_objects())
        {
            shared.state.mark_creation_failed();
            warn!(
                target: "hostcycle::lifecycle",
                host = %shared.key,
                error = %error,
                "cannot retrieve the display objects, host stops here"
            );
            shared.report(error, true);
            return Ok(());
        }

        shared.broadcast(LifecycleEvent::CreateDone);
        Ok(())
    }

    pub fn on_post_create(&self) -> Result<()> {
        self.trace_entry("on_post_create");
        self.ensure_not_destroyed()?;
        self.shared.broadcast_if_keep_on(LifecycleEvent::PostCreate);
        Ok(())
    }

    /// The host's content view was replaced.
    pub fn on_content_changed(&self) -> Result<()> {
        self.trace_entry("on_content_changed");
        self.ensure_not_destroyed()?;
        self.shared.broadcast_if_keep_on(LifecycleEvent::ContentChanged);
        Ok(())
    }

    pub fn on_start(&self) -> Result<()> {
        self.trace_entry("on_start");
        self.advance(LifecyclePhase::Started)?;
        self.shared.broadcast_if_keep_on(LifecycleEvent::Start);
        Ok(())
    }

    /// Emitted before `on_start` when coming back from `Stopped`.
    pub fn on_restart(&self) -> Result<()> {
        self.trace_entry("on_restart");
        self.ensure_not_destroyed()?;
        self.shared.broadcast_if_keep_on(LifecycleEvent::Restart);
        Ok(())
    }

    /// Marks the host interacting and refreshes it, retrieving the business
    /// objects only if no retrieval ever completed.
    pub fn on_resume(&self) -> Result<()> {
        self.trace_entry("on_resume");
        self.advance(LifecyclePhase::Resumed)?;
        if !self.shared.state.should_keep_on() {
            return Ok(());
        }

        self.shared.broadcast(LifecycleEvent::Resume);
        self.shared.state.set_interacting(true);
        self.refresh_like_resume();
        Ok(())
    }

    pub fn on_post_resume(&self) -> Result<()> {
        self.trace_entry("on_post_resume");
        self.ensure_not_destroyed()?;
        self.shared.broadcast_if_keep_on(LifecycleEvent::PostResume);
        Ok(())
    }

    pub fn on_pause(&self) -> Result<()> {
        self.trace_entry("on_pause");
        self.advance(LifecyclePhase::Paused)?;
        self.shared.broadcast_if_keep_on(LifecycleEvent::Pause);
        self.shared.state.set_interacting(false);
        Ok(())
    }

    pub fn on_stop(&self) -> Result<()> {
        self.trace_entry("on_stop");
        self.advance(LifecyclePhase::Stopped)?;
        self.shared.broadcast_if_keep_on(LifecycleEvent::Stop);
        Ok(())
    }

    /// Teardown. Once the transition is accepted the host is marked dead
    /// before any collaborator is called, so that work still in flight stays
    /// silent, and its queued background work is abandoned.
    pub fn on_destroy(&self) -> Result<()> {
        self.trace_entry("on_destroy");
        self.ensure_not_destroyed()?;
        self.advance(LifecyclePhase::Destroyed)?;
        let shared = &self.shared;

        shared.state.mark_dead();
        shared.background.abandon(shared.key);

        if !shared.state.is_redirected() {
            shared.broadcaster.unregister_listeners(shared.key);
        }
        shared.broadcast_if_keep_on(LifecycleEvent::Destroy);
        Ok(())
    }

    /// A new request reached a live host: redirection is checked again.
    pub fn on_new_intent(&self) -> Result<()> {
        self.trace_entry("on_new_intent");
        self.ensure_not_destroyed()?;
        if !self.shared.state.is_redirected() {
            self.check_redirection();
        }
        Ok(())
    }

    /// The host got its saved state back: refresh as a resume would.
    pub fn on_restore_state(&self) -> Result<()> {
        self.trace_entry("on_restore_state");
        self.ensure_not_destroyed()?;
        if self.shared.state.should_keep_on() {
            self.refresh_like_resume();
        }
        Ok(())
    }
}
