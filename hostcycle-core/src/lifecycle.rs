use serde::{Deserialize, Serialize};

/// Coarse lifecycle position of a host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    Destroyed,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Created => "created",
            LifecyclePhase::Started => "started",
            LifecyclePhase::Resumed => "resumed",
            LifecyclePhase::Paused => "paused",
            LifecyclePhase::Stopped => "stopped",
            LifecyclePhase::Destroyed => "destroyed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecyclePhase::Destroyed)
    }

    /// Whether a host sitting in `from` (`None` before creation) may move to
    /// `to`. Teardown is accepted from every live phase.
    pub fn accepts(from: Option<LifecyclePhase>, to: LifecyclePhase) -> bool {
        use LifecyclePhase::*;

        match (from, to) {
            (None, Created) => true,
            (None, _) => false,
            (Some(Destroyed), _) => false,
            (Some(_), Destroyed) => true,
            (Some(Created), Started)
            | (Some(Started), Resumed)
            | (Some(Resumed), Paused)
            | (Some(Paused), Resumed)
            | (Some(Paused), Stopped)
            | (Some(Stopped), Started) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
