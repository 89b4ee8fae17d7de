use thiserror::Error;

use crate::lifecycle::LifecyclePhase;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: PhaseLabel,
        to: LifecyclePhase,
    },

    #[error("host {0} is already destroyed")]
    Destroyed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Source phase of a rejected transition; `None` before creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseLabel(pub Option<LifecyclePhase>);

impl std::fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(phase) => write!(f, "{phase}"),
            None => f.write_str("uncreated"),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
