//! Pessimistic transactions: strict two-phase locking over a [`WriteBatch`], with snapshot
//! conflict validation against the database's latest sequence number for each touched key
//! (§4.14).
//!
//! This module is deliberately generic over a small [`TransactionDb`] capability trait rather
//! than [`crate::inner_leveldb::InnerGenericDB`] directly, the same way [`crate::compaction`]
//! stays generic over a picker strategy instead of a concrete `LevelDBGenerics` instantiation:
//! a transaction only needs to write batches, read keys, and read/compare sequence numbers, and
//! expressing it against that narrow surface keeps it testable with an in-memory fake.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, ErrorCode, Result};
use crate::format::SequenceNumber;
use crate::lock_manager::{LockManager, LockType, TxnId};
use crate::write_batch::WriteBatch;


/// The capability a [`PessimisticTransaction`] needs from a database handle.
///
/// Conflict checking follows the sequence-number-based design noted as preferred in the design
/// notes: a transaction tracks the sequence number at which it last validated each key, and a
/// write conflicts only if the key's current latest sequence exceeds the transaction's snapshot
/// (rather than re-reading and comparing values, which is also correct but does strictly more
/// work for the common case of a transaction that has not been raced).
pub trait TransactionDb {
    /// An immutable read-view pinned to a sequence number, as returned by [`Self::take_snapshot`].
    type Snapshot: Clone;

    /// Commit `batch` as a single atomic write, assigning it one base sequence number.
    fn write(&self, batch: &WriteBatch, sync: bool) -> Result<()>;

    /// Read the current value of `key`, consulting `snapshot` if given or the latest
    /// committed state otherwise.
    fn get(&self, key: &[u8], snapshot: Option<&Self::Snapshot>) -> Result<Option<Vec<u8>>>;

    /// Pin the database's current sequence number for later snapshot reads.
    fn take_snapshot(&self) -> Self::Snapshot;

    /// The sequence number a snapshot is pinned to.
    fn snapshot_sequence(&self, snapshot: &Self::Snapshot) -> SequenceNumber;

    /// The highest sequence number at which `key` has been written, if any. `None` means the
    /// key has never been written (not the same as a tombstone, which does have a sequence).
    fn latest_sequence_for_key(&self, key: &[u8]) -> Result<Option<SequenceNumber>>;
}

/// Generates process-unique transaction identifiers. One instance is expected to be shared by
/// every transaction opened against a given database handle.
#[derive(Debug, Default)]
pub struct TxnIdGenerator(AtomicU64);

impl TxnIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    fn next(&self) -> TxnId {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransactionOptions {
    /// How long a lock acquisition will wait before returning `LockTimeout`.
    pub lock_timeout: Duration,
    /// How long after the transaction begins it may still perform operations. `None` means no
    /// expiration.
    pub expiration: Option<Duration>,
    /// Whether operations take a snapshot for conflict validation. Transactions opened without
    /// a snapshot skip the validation step entirely (first-writer-wins under the lock alone).
    pub set_snapshot: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(1),
            expiration:   None,
            set_snapshot: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Started,
    Committed,
    RolledBack,
}

/// A point the transaction's batch and lock set can be rolled back to, per §4.14. Dropping a
/// `Savepoint` without rolling back to it (i.e. "popping" it) has no user-visible effect; it only
/// stops being a valid rollback target.
struct Savepoint {
    batch_count:  u32,
    locked_since: Vec<Vec<u8>>,
}

/// A strict-2PL transaction over a single [`WriteBatch`], as described in §4.14.
///
/// `put`/`delete`/`single_delete` acquire an exclusive lock on the key before appending to the
/// batch, and validate that no other committed write has touched the key since the
/// transaction's snapshot was taken. Locks are held until `commit` or `rollback`, at which point
/// every lock this transaction holds is released in one call to [`LockManager::unlock_all`].
pub struct PessimisticTransaction<DB: TransactionDb> {
    id:            TxnId,
    db:            DB,
    lock_mgr:      Arc<LockManager>,
    snapshot:      Option<DB::Snapshot>,
    batch:         WriteBatch,
    /// Keys locked by this transaction, in acquisition order (savepoints slice into this).
    locked_keys:   Vec<Vec<u8>>,
    /// The sequence number each key was last validated against; a later `put`/`get_for_update`
    /// on an already-tracked key need not re-validate.
    tracked_keys:  HashMap<Vec<u8>, SequenceNumber>,
    savepoints:    Vec<Savepoint>,
    options:       TransactionOptions,
    started_at:    Instant,
    state:         State,
}

impl<DB: TransactionDb> PessimisticTransaction<DB> {
    #[must_use]
    pub fn begin(
        db:       DB,
        lock_mgr: Arc<LockManager>,
        id_gen:   &TxnIdGenerator,
        options:  TransactionOptions,
    ) -> Self {
        let snapshot = options.set_snapshot.then(|| db.take_snapshot());
        Self {
            id: id_gen.next(),
            db,
            lock_mgr,
            snapshot,
            batch: WriteBatch::new(),
            locked_keys: Vec::new(),
            tracked_keys: HashMap::new(),
            savepoints: Vec::new(),
            options,
            started_at: Instant::now(),
            state: State::Started,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TxnId {
        self.id
    }

    fn check_open(&self) -> Result<()> {
        match self.state {
            State::Started => Ok(()),
            State::Committed | State::RolledBack => {
                Err(Error::new(ErrorCode::TransactionClosed, "transaction is already closed"))
            }
        }
    }

    fn check_not_expired(&self) -> Result<()> {
        if let Some(expiration) = self.options.expiration {
            if self.started_at.elapsed() >= expiration {
                return Err(Error::new(
                    ErrorCode::TransactionExpired,
                    "transaction expiration deadline has passed",
                ));
            }
        }
        Ok(())
    }

    fn lock_exclusive(&mut self, key: &[u8]) -> Result<()> {
        self.lock_mgr.lock(self.id, key, LockType::Exclusive, self.options.lock_timeout)?;
        self.record_lock(key);
        Ok(())
    }

    fn lock_shared(&mut self, key: &[u8]) -> Result<()> {
        self.lock_mgr.lock(self.id, key, LockType::Shared, self.options.lock_timeout)?;
        self.record_lock(key);
        Ok(())
    }

    /// Tracks a newly-acquired lock both in the transaction's overall held set and, if a
    /// savepoint is currently open, in that savepoint's "locked since" list so a later
    /// `rollback_to_savepoint` knows to release it.
    fn record_lock(&mut self, key: &[u8]) {
        self.locked_keys.push(key.to_vec());
        if let Some(savepoint) = self.savepoints.last_mut() {
            savepoint.locked_since.push(key.to_vec());
        }
    }

    /// Validates that `key` has not been written (at a sequence number greater than the
    /// transaction's snapshot) since the snapshot was taken, per §4.14 step 2. A key already
    /// validated at or after the snapshot sequence is skipped, matching the "already validated"
    /// short-circuit in the spec.
    fn validate_snapshot(&mut self, key: &[u8]) -> Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        let snapshot_seq = self.db.snapshot_sequence(snapshot);

        if let Some(&tracked) = self.tracked_keys.get(key) {
            if tracked <= snapshot_seq {
                return Ok(());
            }
        }

        let latest = self.db.latest_sequence_for_key(key)?;
        if let Some(latest_seq) = latest {
            if latest_seq > snapshot_seq {
                return Err(Error::new(
                    ErrorCode::WriteConflict,
                    "key was modified by another transaction after this transaction's snapshot",
                ));
            }
            self.tracked_keys.insert(key.to_vec(), latest_seq);
        }
        Ok(())
    }

    /// Acquires the exclusive lock, validates the snapshot, and only on success appends `apply`
    /// to the batch. On a validation failure the just-acquired lock is released, per step 2's
    /// "release the just-acquired lock on K" instruction — a failed write must not hold a lock
    /// the transaction never gets credit for in its batch.
    fn locked_write(&mut self, key: &[u8], apply: impl FnOnce(&mut WriteBatch)) -> Result<()> {
        self.check_open()?;
        self.check_not_expired()?;

        let already_held = self.locked_keys.iter().any(|held| held == key);
        self.lock_exclusive(key)?;

        if let Err(err) = self.validate_snapshot(key) {
            if !already_held {
                // Best-effort: the lock was just granted by this call, so it is safe to drop.
                let _ = self.lock_mgr.unlock(self.id, key);
                self.locked_keys.retain(|held| held != key);
            }
            return Err(err);
        }

        apply(&mut self.batch);
        Ok(())
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.locked_write(key, |batch| batch.put(key, value))
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.locked_write(key, |batch| batch.delete(key))
    }

    pub fn single_delete(&mut self, key: &[u8]) -> Result<()> {
        self.locked_write(key, |batch| batch.single_delete(key))
    }

    pub fn merge(&mut self, key: &[u8], operand: &[u8]) -> Result<()> {
        self.locked_write(key, |batch| batch.merge(key, operand))
    }

    /// Reads `key`, consulting this transaction's own uncommitted batch first (so a transaction
    /// always sees its own writes), then the database under this transaction's snapshot (if any).
    /// Does not acquire a lock; concurrent writers may still modify `key` before commit.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        self.check_not_expired()?;

        if let Some(own_write) = Self::own_write(&self.batch, key) {
            return Ok(own_write);
        }
        self.db.get(key, self.snapshot.as_ref())
    }

    /// Like [`Self::get`], but also acquires a lock (shared or exclusive) and validates the
    /// snapshot, so that a subsequent conflicting write by another transaction is detected at
    /// commit time rather than silently lost.
    pub fn get_for_update(&mut self, key: &[u8], exclusive: bool) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        self.check_not_expired()?;

        if exclusive {
            self.lock_exclusive(key)?;
        } else {
            self.lock_shared(key)?;
        }
        self.validate_snapshot(key)?;

        if let Some(own_write) = Self::own_write(&self.batch, key) {
            return Ok(own_write);
        }
        self.db.get(key, self.snapshot.as_ref())
    }

    /// Scans this transaction's own batch for the most recent operation touching `key`,
    /// returning `Some(value)` for a put, `Some(None)` for a delete, or `None` if untouched
    /// (in which case the caller should fall through to the database read).
    fn own_write(batch: &WriteBatch, key: &[u8]) -> Option<Option<Vec<u8>>> {
        use crate::public_format::WriteEntry;

        let mut result = None;
        for entry in batch.iter() {
            match entry {
                WriteEntry::Value { key: k, value } if k.data() == key => {
                    result = Some(Some(value.data().to_vec()));
                }
                WriteEntry::Deletion { key: k } | WriteEntry::SingleDeletion { key: k }
                    if k.data() == key =>
                {
                    result = Some(None);
                }
                _ => {}
            }
        }
        result
    }

    /// Records a rollback point at the current batch length and lock set, per §4.14.
    pub fn set_savepoint(&mut self) {
        self.savepoints.push(Savepoint {
            batch_count:  self.batch.length(),
            locked_since: Vec::new(),
        });
        // From here on, newly-locked keys are recorded against the open savepoint so that
        // `rollback_to_savepoint` knows which locks to release.
    }

    /// Truncates the batch back to the most recent savepoint and releases every lock acquired
    /// since, per §4.14. Errors if no savepoint is open.
    pub fn rollback_to_savepoint(&mut self) -> Result<()> {
        self.check_open()?;
        let savepoint = self.savepoints.pop().ok_or_else(|| {
            Error::new(ErrorCode::InvalidArgument, "no savepoint to roll back to")
        })?;

        self.batch.truncate_to(savepoint.batch_count);

        for key in &savepoint.locked_since {
            let _ = self.lock_mgr.unlock(self.id, key);
        }
        self.locked_keys.retain(|held| !savepoint.locked_since.contains(held));
        Ok(())
    }

    /// Discards the most recent savepoint without rolling back to it. No user-visible effect.
    pub fn pop_savepoint(&mut self) -> Result<()> {
        self.savepoints.pop().ok_or_else(|| {
            Error::new(ErrorCode::InvalidArgument, "no savepoint to pop")
        })?;
        Ok(())
    }

    /// Commits the batch atomically via [`TransactionDb::write`], then releases every lock this
    /// transaction holds. A write failure leaves the transaction open so the caller may retry or
    /// roll back; per §4.14, the underlying write is expected to be fatal on failure, matching
    /// the rest of the write path's durability boundary.
    pub fn commit(mut self) -> Result<()> {
        self.check_open()?;
        self.db.write(&self.batch, true)?;
        self.lock_mgr.unlock_all(self.id);
        self.state = State::Committed;
        Ok(())
    }

    /// Discards the batch and releases every lock this transaction holds.
    pub fn rollback(mut self) -> Result<()> {
        self.check_open()?;
        self.lock_mgr.unlock_all(self.id);
        self.state = State::RolledBack;
        Ok(())
    }
}

impl<DB: TransactionDb> Drop for PessimisticTransaction<DB> {
    /// Best-effort rollback for a transaction dropped without an explicit `commit`/`rollback`
    /// call (e.g. unwinding, or a database handle closing with transactions still open), per the
    /// cancellation policy in §5: "in-flight transactions are best-effort rolled back."
    fn drop(&mut self) {
        if self.state == State::Started {
            self.lock_mgr.unlock_all(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// A minimal in-memory database fake implementing [`TransactionDb`], sufficient to exercise
    /// the locking, validation, and commit/rollback behavior in isolation from the full LSM core.
    #[derive(Clone)]
    struct FakeDb(Arc<Mutex<FakeDbState>>);

    struct FakeDbState {
        data:          HashMap<Vec<u8>, Vec<u8>>,
        seq_for_key:   HashMap<Vec<u8>, SequenceNumber>,
        last_sequence: SequenceNumber,
    }

    impl FakeDb {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(FakeDbState {
                data:          HashMap::new(),
                seq_for_key:   HashMap::new(),
                last_sequence: SequenceNumber::ZERO,
            })))
        }
    }

    impl TransactionDb for FakeDb {
        type Snapshot = SequenceNumber;

        fn write(&self, batch: &WriteBatch, _sync: bool) -> Result<()> {
            use crate::public_format::WriteEntry;
            let mut state = self.0.lock().unwrap();
            for entry in batch.iter() {
                state.last_sequence = state.last_sequence.checked_add(1).unwrap();
                let seq = state.last_sequence;
                match entry {
                    WriteEntry::Value { key, value } => {
                        state.data.insert(key.data().to_vec(), value.data().to_vec());
                        state.seq_for_key.insert(key.data().to_vec(), seq);
                    }
                    WriteEntry::Deletion { key } | WriteEntry::SingleDeletion { key } => {
                        state.data.remove(key.data());
                        state.seq_for_key.insert(key.data().to_vec(), seq);
                    }
                    _ => {}
                }
            }
            Ok(())
        }

        fn get(&self, key: &[u8], _snapshot: Option<&Self::Snapshot>) -> Result<Option<Vec<u8>>> {
            Ok(self.0.lock().unwrap().data.get(key).cloned())
        }

        fn take_snapshot(&self) -> Self::Snapshot {
            self.0.lock().unwrap().last_sequence
        }

        fn snapshot_sequence(&self, snapshot: &Self::Snapshot) -> SequenceNumber {
            *snapshot
        }

        fn latest_sequence_for_key(&self, key: &[u8]) -> Result<Option<SequenceNumber>> {
            Ok(self.0.lock().unwrap().seq_for_key.get(key).copied())
        }
    }

    fn harness() -> (FakeDb, Arc<LockManager>, TxnIdGenerator) {
        (FakeDb::new(), Arc::new(LockManager::new(4)), TxnIdGenerator::new())
    }

    #[test]
    fn put_then_get_sees_own_write_before_commit() {
        let (db, locks, ids) = harness();
        let mut txn = PessimisticTransaction::begin(db, locks, &ids, TransactionOptions::default());
        txn.put(b"k", b"v1").unwrap();
        assert_eq!(txn.get(b"k").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn commit_releases_locks_for_other_transactions() {
        let (db, locks, ids) = harness();
        let mut txn = PessimisticTransaction::begin(db.clone(), Arc::clone(&locks), &ids, TransactionOptions::default());
        txn.put(b"k", b"v1").unwrap();
        txn.commit().unwrap();

        let mut txn2 = PessimisticTransaction::begin(db, locks, &ids, TransactionOptions::default());
        txn2.put(b"k", b"v2").unwrap();
        txn2.commit().unwrap();
    }

    #[test]
    fn snapshot_conflict_is_detected() {
        let (db, locks, ids) = harness();

        let mut txn1 = PessimisticTransaction::begin(db.clone(), Arc::clone(&locks), &ids, TransactionOptions::default());
        // txn1 takes its snapshot at the current (empty) state.

        // A separate writer commits a change to the same key, outside of any transaction.
        let mut out_of_band = WriteBatch::new();
        out_of_band.put(b"k", b"racer");
        db.write(&out_of_band, true).unwrap();

        let err = txn1.put(b"k", b"mine").unwrap_err();
        assert_eq!(err.code, ErrorCode::WriteConflict);
    }

    #[test]
    fn rollback_discards_batch_and_releases_locks() {
        let (db, locks, ids) = harness();
        let mut txn = PessimisticTransaction::begin(db.clone(), Arc::clone(&locks), &ids, TransactionOptions::default());
        txn.put(b"k", b"v1").unwrap();
        txn.rollback().unwrap();

        assert_eq!(db.get(b"k", None).unwrap(), None);

        // The lock is available again for a new transaction.
        let mut txn2 = PessimisticTransaction::begin(db, locks, &ids, TransactionOptions::default());
        txn2.put(b"k", b"v2").unwrap();
        txn2.commit().unwrap();
    }

    #[test]
    fn savepoint_rollback_truncates_batch_and_unlocks() {
        let (db, locks, ids) = harness();
        let mut txn = PessimisticTransaction::begin(db, Arc::clone(&locks), &ids, TransactionOptions::default());
        txn.put(b"a", b"1").unwrap();
        txn.set_savepoint();
        txn.put(b"b", b"2").unwrap();
        assert_eq!(txn.batch.length(), 2);

        txn.rollback_to_savepoint().unwrap();
        assert_eq!(txn.batch.length(), 1);
        assert_eq!(PessimisticTransaction::<FakeDb>::own_write(&txn.batch, b"b"), None);

        txn.commit().unwrap();
    }

    #[test]
    fn expired_transaction_rejects_operations() {
        let (db, locks, ids) = harness();
        let options = TransactionOptions {
            expiration: Some(Duration::from_millis(1)),
            ..TransactionOptions::default()
        };
        let mut txn = PessimisticTransaction::begin(db, locks, &ids, options);
        std::thread::sleep(Duration::from_millis(20));

        let err = txn.put(b"k", b"v").unwrap_err();
        assert_eq!(err.code, ErrorCode::TransactionExpired);
    }
}
