use crate::store::{
    ATTEMPTS_KEY, BreakerStore, CIRCUIT_BROKEN_KEY, DEFAULT_TRIP_THRESHOLD, KeyValueStore,
    MemoryStore,
};

use std::sync::Arc;

fn breaker() -> (Arc<MemoryStore>, BreakerStore) {
    let store = Arc::new(MemoryStore::new());
    let breaker = BreakerStore::new(store.clone());
    (store, breaker)
}

#[test]
fn given_empty_scope_when_read_then_zero_attempts_and_not_broken() {
    // GIVEN: Nothing stored
    let (_store, breaker) = breaker();

    // WHEN/THEN: Defaults
    assert_eq!(breaker.attempts(), 0);
    assert!(!breaker.is_broken());
    assert_eq!(breaker.trip_threshold(), DEFAULT_TRIP_THRESHOLD);
}

/// **VALUE**: The breaker trips on the fifth consecutive failure, not the sixth.
///
/// **BUG THIS CATCHES**: An off-by-one (`>` instead of `>=`) that grants a sixth
/// attempt.
#[test]
fn given_four_failures_when_fifth_recorded_then_breaker_trips() {
    // GIVEN: Four failures
    let (store, breaker) = breaker();
    for expected in 1..=4 {
        assert_eq!(breaker.record_failure(), expected);
        assert!(!breaker.is_broken(), "tripped early at {expected}");
    }

    // WHEN: Fifth failure
    let attempts = breaker.record_failure();

    // THEN: Tripped, flag stored as "true"
    assert_eq!(attempts, 5);
    assert!(breaker.is_broken());
    assert_eq!(store.get(CIRCUIT_BROKEN_KEY).as_deref(), Some("true"));
    assert_eq!(store.get(ATTEMPTS_KEY).as_deref(), Some("5"));
}

#[test]
fn given_tripped_breaker_when_reset_then_zero_attempts_and_flag_removed() {
    let (store, breaker) = breaker();
    for _ in 0..5 {
        breaker.record_failure();
    }

    breaker.reset();

    assert_eq!(breaker.attempts(), 0);
    assert!(!breaker.is_broken());
    assert_eq!(store.get(CIRCUIT_BROKEN_KEY), None);
}

#[test]
fn given_clear_breaker_when_reset_twice_then_no_change() {
    let (store, breaker) = breaker();

    breaker.reset();
    let after_first = (store.get(ATTEMPTS_KEY), store.get(CIRCUIT_BROKEN_KEY));
    breaker.reset();
    let after_second = (store.get(ATTEMPTS_KEY), store.get(CIRCUIT_BROKEN_KEY));

    assert_eq!(after_first, after_second);
    assert_eq!(breaker.attempts(), 0);
}

#[test]
fn given_garbage_attempt_value_when_read_then_treated_as_zero() {
    // GIVEN: Something other than a number in storage
    let (store, breaker) = breaker();
    store.set(ATTEMPTS_KEY, "lots");

    // WHEN: Recording a failure
    let attempts = breaker.record_failure();

    // THEN: Counting restarts from zero
    assert_eq!(attempts, 1);
}

#[test]
fn given_flag_not_exactly_true_when_read_then_not_broken() {
    let (store, breaker) = breaker();
    store.set(CIRCUIT_BROKEN_KEY, "yes");

    assert!(!breaker.is_broken());
}

#[test]
fn given_zero_threshold_when_constructed_then_raised_to_one() {
    let breaker = BreakerStore::with_threshold(Arc::new(MemoryStore::new()), 0);

    assert_eq!(breaker.trip_threshold(), 1);
    breaker.record_failure();
    assert!(breaker.is_broken());
}

#[test]
fn given_tripped_breaker_when_more_failures_recorded_then_keeps_counting() {
    let breaker = BreakerStore::with_threshold(Arc::new(MemoryStore::new()), 2);
    breaker.record_failure();
    breaker.record_failure();

    let attempts = breaker.record_failure();

    assert_eq!(attempts, 3);
    assert!(breaker.is_broken());
}

#[test]
fn given_breaker_when_trip_forced_then_counter_untouched() {
    let (_store, breaker) = breaker();
    breaker.record_failure();

    breaker.trip();

    assert!(breaker.is_broken());
    assert_eq!(breaker.attempts(), 1);
}
