use super::{ATTEMPTS_KEY, CIRCUIT_BROKEN_KEY, KeyValueStore};

use std::sync::Arc;

use log::warn;

/// Consecutive failures allowed before the breaker trips.
pub const DEFAULT_TRIP_THRESHOLD: u32 = 5;

const BROKEN_SENTINEL: &str = "true";

/// Typed access to the failure counter and breaker flag in the ephemeral scope.
///
/// Absent keys read as `{attempts: 0, broken: false}`. Unparseable values read the
/// same way.
#[derive(Clone)]
pub struct BreakerStore {
    store: Arc<dyn KeyValueStore>,
    trip_threshold: u32,
}

impl BreakerStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_threshold(store, DEFAULT_TRIP_THRESHOLD)
    }

    /// A threshold of zero is raised to one; the breaker cannot trip before a failure.
    pub fn with_threshold(store: Arc<dyn KeyValueStore>, trip_threshold: u32) -> Self {
        Self {
            store,
            trip_threshold: trip_threshold.max(1),
        }
    }

    pub fn trip_threshold(&self) -> u32 {
        self.trip_threshold
    }

    pub fn attempts(&self) -> u32 {
        match self.store.get(ATTEMPTS_KEY) {
            None => 0,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring unparseable {ATTEMPTS_KEY} value");
                0
            }),
        }
    }

    pub fn is_broken(&self) -> bool {
        self.store.get(CIRCUIT_BROKEN_KEY).as_deref() == Some(BROKEN_SENTINEL)
    }

    /// Count one more failure and return the new total.
    ///
    /// Sets the broken flag once the total reaches the threshold. Already-broken
    /// breakers keep counting but are not re-tripped.
    pub fn record_failure(&self) -> u32 {
        let attempts = self.attempts().saturating_add(1);
        self.store.set(ATTEMPTS_KEY, &attempts.to_string());

        if attempts >= self.trip_threshold && !self.is_broken() {
            self.trip();
        }

        attempts
    }

    /// Back to `{0, false}`. Calling it on a clear breaker changes nothing.
    pub fn reset(&self) {
        self.store.set(ATTEMPTS_KEY, "0");
        self.store.remove(CIRCUIT_BROKEN_KEY);
    }

    /// Force the broken flag without touching the counter.
    pub fn trip(&self) {
        self.store.set(CIRCUIT_BROKEN_KEY, BROKEN_SENTINEL);
    }

    /// Wipe the whole ephemeral scope.
    pub(crate) fn clear_scope(&self) {
        self.store.clear();
    }
}
