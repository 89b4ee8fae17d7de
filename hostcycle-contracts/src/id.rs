use uuid::Uuid;

/// Identity of a single host instance.
///
/// Every orchestrator mints one key for its whole lifetime. Executors use it
/// to group submitted work so that everything belonging to a destroyed host
/// can be abandoned at once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostKey(pub Uuid);

impl Default for HostKey {
    fn default() -> Self {
        Self::new()
    }
}

impl HostKey {
    pub fn new() -> Self {
        HostKey(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl AsRef<Uuid> for HostKey {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for HostKey {
    fn from(value: Uuid) -> Self {
        HostKey(value)
    }
}

impl std::fmt::Display for HostKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
