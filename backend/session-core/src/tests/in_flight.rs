use crate::controller::in_flight::InFlightGuard;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[test]
fn given_held_guard_when_second_claim_then_refused_until_dropped() {
    // GIVEN: One guard holding the slot
    let flag = Arc::new(AtomicBool::new(false));
    let first = InFlightGuard::claim(&flag);
    assert!(first.is_some());

    // WHEN: Claiming again
    let second = InFlightGuard::claim(&flag);

    // THEN: Refused; released once the first guard drops
    assert!(second.is_none());
    drop(first);
    assert!(!flag.load(Ordering::Acquire));
    assert!(InFlightGuard::claim(&flag).is_some());
}
