//! Stripe-sharded exclusive/shared locks over arbitrary byte-string keys, with FIFO wait
//! queues and wait-for-graph deadlock detection. Used by [`crate::transaction`] to implement
//! strict two-phase locking for pessimistic transactions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, ErrorCode, Result};


pub type TxnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    Shared,
    Exclusive,
}

impl LockType {
    /// Whether a holder of `self` and a requester of `other` may both hold the lock at once.
    #[inline]
    fn compatible(self, other: Self) -> bool {
        matches!((self, other), (Self::Shared, Self::Shared))
    }

    /// The stronger of the two lock types, used for transaction reentrancy: a transaction
    /// upgrading its own hold on a key ends up holding the strongest mode it ever requested.
    #[inline]
    fn strongest(self, other: Self) -> Self {
        if self == Self::Exclusive || other == Self::Exclusive {
            Self::Exclusive
        } else {
            Self::Shared
        }
    }
}

#[derive(Default)]
struct KeyState {
    holders:     HashMap<TxnId, LockType>,
    wait_queue:  VecDeque<TxnId>,
}

impl KeyState {
    fn compatible_with(&self, txn_id: TxnId, wanted: LockType) -> bool {
        self.holders.iter().all(|(&holder, &held_type)| {
            holder == txn_id || held_type.compatible(wanted)
        })
    }
}

struct Stripe {
    table: Mutex<HashMap<Vec<u8>, KeyState>>,
    cvar:  Condvar,
}

impl Default for Stripe {
    fn default() -> Self {
        Self { table: Mutex::new(HashMap::new()), cvar: Condvar::new() }
    }
}

pub struct LockManager {
    stripes:      Vec<Stripe>,
    num_stripes:  usize,
    /// Waiter -> the set of transactions it is currently blocked behind. Rebuilt on every
    /// blocking attempt; read in full by `has_cycle` to run deadlock detection.
    wait_for:     Mutex<HashMap<TxnId, HashSet<TxnId>>>,
    /// Per-transaction index of held keys, so `unlock_all` doesn't need to scan every stripe.
    held_by_txn:  Mutex<HashMap<TxnId, HashSet<(usize, Vec<u8>)>>>,
}

impl LockManager {
    #[must_use]
    pub fn new(num_stripes: usize) -> Self {
        let num_stripes = num_stripes.max(1);
        Self {
            stripes:     (0..num_stripes).map(|_| Stripe::default()).collect(),
            num_stripes,
            wait_for:    Mutex::new(HashMap::new()),
            held_by_txn: Mutex::new(HashMap::new()),
        }
    }

    fn stripe_index(&self, key: &[u8]) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.num_stripes
    }

    /// Blocks until `key` is acquired in mode `lock_type`, a deadlock involving `txn_id` is
    /// detected, or `timeout` elapses.
    pub fn lock(
        &self,
        txn_id:    TxnId,
        key:       &[u8],
        lock_type: LockType,
        timeout:   Duration,
    ) -> Result<()> {
        let stripe_idx = self.stripe_index(key);
        let stripe = &self.stripes[stripe_idx];
        let deadline = Instant::now() + timeout;

        let mut table = stripe.table.lock();
        loop {
            let state = table.entry(key.to_vec()).or_default();

            if let Some(&held) = state.holders.get(&txn_id) {
                state.holders.insert(txn_id, held.strongest(lock_type));
                drop(table);
                self.record_held(txn_id, stripe_idx, key);
                return Ok(());
            }

            let front_is_self = match state.wait_queue.front() {
                None => true,
                Some(&t) => t == txn_id,
            };
            if front_is_self && state.compatible_with(txn_id, lock_type) {
                state.wait_queue.retain(|&id| id != txn_id);
                state.holders.insert(txn_id, lock_type);
                drop(table);
                self.record_held(txn_id, stripe_idx, key);
                return Ok(());
            }

            if !state.wait_queue.contains(&txn_id) {
                state.wait_queue.push_back(txn_id);
            }
            let waiting_on: HashSet<TxnId> = state.holders.keys()
                .copied()
                .filter(|&holder| holder != txn_id)
                .collect();

            self.wait_for.lock().insert(txn_id, waiting_on);

            if self.has_cycle(txn_id) {
                self.wait_for.lock().remove(&txn_id);
                let state = table.get_mut(key).expect("state inserted above");
                state.wait_queue.retain(|&id| id != txn_id);
                return Err(Error::new(ErrorCode::Deadlock, "deadlock detected acquiring lock"));
            }

            let now = Instant::now();
            if now >= deadline {
                self.wait_for.lock().remove(&txn_id);
                let state = table.get_mut(key).expect("state inserted above");
                state.wait_queue.retain(|&id| id != txn_id);
                return Err(Error::new(ErrorCode::LockTimeout, "timed out waiting for lock"));
            }

            let remaining = deadline - now;
            let timed_out = stripe.cvar.wait_for(&mut table, remaining).timed_out();
            self.wait_for.lock().remove(&txn_id);

            if timed_out {
                if let Some(state) = table.get_mut(key) {
                    state.wait_queue.retain(|&id| id != txn_id);
                }
                return Err(Error::new(ErrorCode::LockTimeout, "timed out waiting for lock"));
            }
            // Loop around: re-check compatibility now that something changed.
        }
    }

    /// Non-blocking variant of [`Self::lock`]; returns `false` on any conflict instead of waiting.
    #[must_use]
    pub fn try_lock(&self, txn_id: TxnId, key: &[u8], lock_type: LockType) -> bool {
        let stripe_idx = self.stripe_index(key);
        let mut table = self.stripes[stripe_idx].table.lock();
        let state = table.entry(key.to_vec()).or_default();

        if let Some(&held) = state.holders.get(&txn_id) {
            state.holders.insert(txn_id, held.strongest(lock_type));
        } else if state.wait_queue.is_empty() && state.compatible_with(txn_id, lock_type) {
            state.holders.insert(txn_id, lock_type);
        } else {
            return false;
        }
        drop(table);
        self.record_held(txn_id, stripe_idx, key);
        true
    }

    pub fn unlock(&self, txn_id: TxnId, key: &[u8]) -> Result<()> {
        let stripe_idx = self.stripe_index(key);
        let stripe = &self.stripes[stripe_idx];
        {
            let mut table = stripe.table.lock();
            let Some(state) = table.get_mut(key) else {
                return Err(Error::new(ErrorCode::LockNotHeld, "key is not locked"));
            };
            if state.holders.remove(&txn_id).is_none() {
                return Err(Error::new(ErrorCode::LockNotHeld, "transaction does not hold key"));
            }
            if state.holders.is_empty() && state.wait_queue.is_empty() {
                table.remove(key);
            }
        }
        stripe.cvar.notify_all();
        self.held_by_txn.lock().get_mut(&txn_id).map(|keys| keys.remove(&(stripe_idx, key.to_vec())));
        Ok(())
    }

    /// Releases every key `txn_id` holds. Used on transaction commit, rollback, and best-effort
    /// cleanup when a database handle closes with transactions still open.
    pub fn unlock_all(&self, txn_id: TxnId) {
        let Some(keys) = self.held_by_txn.lock().remove(&txn_id) else {
            return;
        };
        for (stripe_idx, key) in keys {
            let stripe = &self.stripes[stripe_idx];
            {
                let mut table = stripe.table.lock();
                if let Some(state) = table.get_mut(&key) {
                    state.holders.remove(&txn_id);
                    if state.holders.is_empty() && state.wait_queue.is_empty() {
                        table.remove(&key);
                    }
                }
            }
            stripe.cvar.notify_all();
        }
        self.wait_for.lock().remove(&txn_id);
    }

    fn record_held(&self, txn_id: TxnId, stripe_idx: usize, key: &[u8]) {
        self.held_by_txn.lock()
            .entry(txn_id)
            .or_default()
            .insert((stripe_idx, key.to_vec()));
    }

    /// Depth-first search over the wait-for graph for a cycle reachable from `start`.
    fn has_cycle(&self, start: TxnId) -> bool {
        let wait_for = self.wait_for.lock();
        let mut stack = vec![start];
        let mut visited = HashSet::new();

        while let Some(node) = stack.pop() {
            let Some(neighbors) = wait_for.get(&node) else { continue };
            for &next in neighbors {
                if next == start {
                    return true;
                }
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn reentrant_same_txn_same_key() {
        let mgr = LockManager::new(4);
        mgr.lock(1, b"k", LockType::Exclusive, Duration::from_millis(100)).unwrap();
        mgr.lock(1, b"k", LockType::Exclusive, Duration::from_millis(100)).unwrap();
        mgr.unlock(1, b"k").unwrap();
    }

    #[test]
    fn shared_locks_compatible() {
        let mgr = LockManager::new(4);
        mgr.lock(1, b"k", LockType::Shared, Duration::from_millis(100)).unwrap();
        mgr.lock(2, b"k", LockType::Shared, Duration::from_millis(100)).unwrap();
    }

    #[test]
    fn exclusive_blocks_until_timeout() {
        let mgr = LockManager::new(4);
        mgr.lock(1, b"k", LockType::Exclusive, Duration::from_millis(500)).unwrap();
        let err = mgr.lock(2, b"k", LockType::Exclusive, Duration::from_millis(50)).unwrap_err();
        assert_eq!(err.code, ErrorCode::LockTimeout);
    }

    #[test]
    fn unlock_releases_for_waiter() {
        let mgr = Arc::new(LockManager::new(4));
        mgr.lock(1, b"k", LockType::Exclusive, Duration::from_millis(500)).unwrap();

        let mgr2 = Arc::clone(&mgr);
        let handle = thread::spawn(move || {
            mgr2.lock(2, b"k", LockType::Exclusive, Duration::from_secs(5))
        });

        thread::sleep(Duration::from_millis(50));
        mgr.unlock(1, b"k").unwrap();

        handle.join().unwrap().unwrap();
    }

    #[test]
    fn three_way_deadlock_chain_is_detected() {
        // T1 holds k1, waits for k2; T2 holds k2, waits for k3; T3 holds k3, waits for k1.
        let mgr = Arc::new(LockManager::new(4));
        mgr.lock(1, b"k1", LockType::Exclusive, Duration::from_secs(5)).unwrap();
        mgr.lock(2, b"k2", LockType::Exclusive, Duration::from_secs(5)).unwrap();
        mgr.lock(3, b"k3", LockType::Exclusive, Duration::from_secs(5)).unwrap();

        let mgr_a = Arc::clone(&mgr);
        let t1 = thread::spawn(move || mgr_a.lock(1, b"k2", LockType::Exclusive, Duration::from_secs(5)));
        let mgr_b = Arc::clone(&mgr);
        let t2 = thread::spawn(move || mgr_b.lock(2, b"k3", LockType::Exclusive, Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(100));
        // Closing the cycle: T3 -> k1, already held by T1 which is waiting on k2 held by T2
        // which is waiting on k3 held by T3.
        let result = mgr.lock(3, b"k1", LockType::Exclusive, Duration::from_secs(5));
        assert_eq!(result.unwrap_err().code, ErrorCode::Deadlock);

        mgr.unlock_all(3);
        t1.join().unwrap().unwrap();
        t2.join().unwrap().unwrap();
    }

    #[test]
    fn unlock_all_releases_every_held_key() {
        let mgr = LockManager::new(4);
        mgr.lock(1, b"a", LockType::Exclusive, Duration::from_millis(100)).unwrap();
        mgr.lock(1, b"b", LockType::Exclusive, Duration::from_millis(100)).unwrap();
        mgr.unlock_all(1);
        mgr.lock(2, b"a", LockType::Exclusive, Duration::from_millis(100)).unwrap();
        mgr.lock(2, b"b", LockType::Exclusive, Duration::from_millis(100)).unwrap();
    }
}
