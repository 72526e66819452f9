use serde::{Deserialize, Serialize};

/// The kind of entry a [`StateKey`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Notification log entries, keyed by `receiver:group-key`.
    Nflog,
    /// Silence records, keyed by silence id.
    Silence,
    /// Aggregation group state, keyed by `route-id:group-key`.
    Group,
    /// Index of groups with an armed flush timer, for recovery on restart.
    PendingGroups,
    /// Index of currently-firing alert fingerprints, for inhibition lookups.
    ActiveAlerts,
    /// Cluster-coordination entries (ownership tokens, membership epoch).
    ClusterLock,
}

impl KeyKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Nflog => "nflog",
            Self::Silence => "silence",
            Self::Group => "group",
            Self::PendingGroups => "pending_groups",
            Self::ActiveAlerts => "active_alerts",
            Self::ClusterLock => "cluster_lock",
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-qualified key into the state store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub kind: KeyKind,
    pub id: String,
}

impl StateKey {
    #[must_use]
    pub fn new(kind: KeyKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_format() {
        let key = StateKey::new(KeyKind::Nflog, "default:abc123");
        assert_eq!(key.canonical(), "nflog:default:abc123");
    }
}
