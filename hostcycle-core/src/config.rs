use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};

/// Global knobs that tune orchestrator behaviour.
///
/// All fields carry defaults so a host wrapper can supply a partial TOML
/// document, or nothing at all.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// What happens to an `immediate` refresh request arriving while a cycle
    /// is already in flight.
    pub immediate_policy: ImmediatePolicy,
    /// Emit a `debug` record for every lifecycle entry point.
    pub lifecycle_debug_logs: bool,
    /// Sizing of the tokio background pool.
    pub background: BackgroundPoolConfig,
}

/// Handling of `immediate` requests that collide with an in-flight cycle.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
pub enum ImmediatePolicy {
    /// Same as any other request: it takes the pending slot, replacing
    /// whatever was there (last request wins).
    #[default]
    Coalesce,
    /// Dropped silently; the pending slot is left untouched.
    DropWhenBusy,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BackgroundPoolConfig {
    /// Maximum number of retrieval phases running at the same time.
    #[serde(default = "BackgroundPoolConfig::default_max_workers")]
    pub max_workers: usize,
}

impl Default for BackgroundPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: Self::default_max_workers(),
        }
    }
}

impl BackgroundPoolConfig {
    const fn default_max_workers() -> usize {
        4
    }
}

impl OrchestratorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: OrchestratorConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.background.max_workers == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "background.max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
