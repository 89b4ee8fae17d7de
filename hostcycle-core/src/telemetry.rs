use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{OrchestratorError, Result};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str =
    "info,hostcycle::lifecycle=info,hostcycle::refresh=info,hostcycle::executor=warn";

/// Installs the global `tracing` subscriber: an `EnvFilter` honouring
/// `RUST_LOG` (falling back to `default_filter`) and a fmt layer.
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| OrchestratorError::Telemetry(err.to_string()))
}
