//! One-time `state → nonce` registry carrying a flow across the redirect
//! round-trip.

use std::sync::Mutex;
use std::time::Duration;

use lru_time_cache::LruCache;

use crate::helpers::random_token;
use crate::types::Error;

pub(crate) const STATE_LENGTH: usize = 16;
pub(crate) const NONCE_LENGTH: usize = 20;

/// Abandoned flows expire instead of accumulating.
const STATE_TTL: Duration = Duration::from_secs(600);
const STATE_CAPACITY: usize = 4096;

/// # StateRegistry
/// Concurrent map from the opaque `state` sent with the authorization
/// redirect to the `nonce` bound into the ID token. Entries are consumed
/// exactly once: [`StateRegistry::claim`] is delete-on-read.
pub struct StateRegistry {
    entries: Mutex<LruCache<String, String>>,
}

impl Default for StateRegistry {
    fn default() -> Self {
        StateRegistry::new()
    }
}

impl StateRegistry {
    /// Creates an empty registry with the default TTL policy.
    pub fn new() -> Self {
        StateRegistry {
            entries: Mutex::new(LruCache::with_expiry_duration_and_capacity(
                STATE_TTL,
                STATE_CAPACITY,
            )),
        }
    }

    /// Issues a fresh `(state, nonce)` pair. The state is guaranteed absent
    /// from the registry at insertion time.
    pub fn issue(&self) -> (String, String) {
        let nonce = random_token(NONCE_LENGTH);
        let mut state = random_token(STATE_LENGTH);

        let mut entries = self.entries.lock().expect("state registry poisoned");
        while entries.contains_key(&state) {
            state = random_token(STATE_LENGTH);
        }
        entries.insert(state.clone(), nonce.clone());

        (state, nonce)
    }

    /// Returns the nonce issued with `state` and removes the entry. A state
    /// of the wrong length is rejected before the registry is consulted.
    pub fn claim(&self, state: &str) -> Result<String, Error> {
        if state.len() != STATE_LENGTH {
            return Err(Error::InvalidState);
        }

        let mut entries = self.entries.lock().expect("state registry poisoned");
        entries.remove(&state.to_string()).ok_or(Error::InvalidState)
    }

    /// Removes `state` unconditionally.
    pub fn unset(&self, state: &str) {
        let mut entries = self.entries.lock().expect("state registry poisoned");
        entries.remove(&state.to_string());
    }
}

#[cfg(test)]
#[path = "./tests/state_tests.rs"]
mod state_tests;
