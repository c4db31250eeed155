use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

use super::*;

#[test]
fn issues_pairs_with_the_documented_lengths() {
    let registry = StateRegistry::new();
    let (state, nonce) = registry.issue();

    assert_eq!(STATE_LENGTH, state.len());
    assert_eq!(NONCE_LENGTH, nonce.len());
}

#[test]
fn claim_returns_the_issued_nonce_exactly_once() {
    let registry = StateRegistry::new();
    let (state, nonce) = registry.issue();

    assert_eq!(nonce, registry.claim(&state).unwrap());
    assert_eq!(Err(Error::InvalidState), registry.claim(&state));
}

#[test]
fn malformed_states_fail_before_the_registry_is_consulted() {
    let registry = StateRegistry::new();

    assert_eq!(Err(Error::InvalidState), registry.claim(""));
    assert_eq!(Err(Error::InvalidState), registry.claim("short"));
    assert_eq!(
        Err(Error::InvalidState),
        registry.claim(&"x".repeat(STATE_LENGTH + 1))
    );
    // Right length, never issued.
    assert_eq!(
        Err(Error::InvalidState),
        registry.claim(&"x".repeat(STATE_LENGTH))
    );
}

#[test]
fn unset_discards_a_pending_state() {
    let registry = StateRegistry::new();
    let (state, _) = registry.issue();

    registry.unset(&state);
    assert_eq!(Err(Error::InvalidState), registry.claim(&state));
}

#[test]
fn concurrent_issue_never_repeats_a_state() {
    let registry = Arc::new(StateRegistry::new());
    let seen = Arc::new(Mutex::new(HashSet::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for _ in 0..64 {
                    let (state, _) = registry.issue();
                    seen.lock().unwrap().insert(state);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(8 * 64, seen.lock().unwrap().len());
}
