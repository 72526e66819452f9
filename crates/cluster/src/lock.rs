use std::time::Duration;

use relaymux_state::{KeyKind, StateKey, StateStore};

/// A TTL'd ownership token used to elect a single peer to run the
/// anti-entropy pull on a given tick, so a cluster doesn't have every
/// peer hammering the same random target at once. Grounded on the same
/// `check_and_set`-with-TTL pattern a replicated coordinator lock uses:
/// whoever creates the key first holds it until it expires.
pub struct AntiEntropyLock<'a> {
    state: &'a dyn StateStore,
    key: StateKey,
}

impl<'a> AntiEntropyLock<'a> {
    #[must_use]
    pub fn new(state: &'a dyn StateStore) -> Self {
        Self { state, key: StateKey::new(KeyKind::ClusterLock, "anti-entropy-coordinator") }
    }

    /// Attempt to become the coordinator for this tick. Returns `true` if
    /// this call acquired the token.
    ///
    /// # Errors
    ///
    /// Returns a state-store error on a backend failure.
    pub async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool, relaymux_state::StateError> {
        self.state.check_and_set(&self.key, holder, Some(ttl)).await
    }
}
