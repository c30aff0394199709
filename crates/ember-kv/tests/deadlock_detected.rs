//! End-to-end scenario: two transactions requesting each other's held keys in opposite order
//! produce exactly one `Deadlock` error, and the other request eventually succeeds.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ember_kv::error::ErrorCode;
use ember_kv::lock_manager::{LockManager, LockType};

#[test]
fn crossing_lock_requests_detect_exactly_one_deadlock() {
    let mgr = Arc::new(LockManager::new(4));

    // T1 holds k1, T2 holds k2.
    mgr.lock(1, b"k1", LockType::Exclusive, Duration::from_secs(5)).unwrap();
    mgr.lock(2, b"k2", LockType::Exclusive, Duration::from_secs(5)).unwrap();

    // T1 requests k2 (held by T2) from a background thread.
    let mgr_t1 = Arc::clone(&mgr);
    let t1 = thread::spawn(move || {
        mgr_t1.lock(1, b"k2", LockType::Exclusive, Duration::from_secs(5))
    });

    thread::sleep(Duration::from_millis(100));

    // T2 requests k1 (held by T1, which is waiting on T2): this closes the cycle, so the
    // synchronous request is the one that observes the deadlock.
    let t2_result = mgr.lock(2, b"k1", LockType::Exclusive, Duration::from_secs(5));
    assert_eq!(t2_result.unwrap_err().code, ErrorCode::Deadlock);

    // Releasing T2 lets T1 proceed to acquire both of its locks.
    mgr.unlock_all(2);
    t1.join().unwrap().expect("the non-deadlocked transaction should eventually acquire its lock");

    mgr.unlock_all(1);
}
