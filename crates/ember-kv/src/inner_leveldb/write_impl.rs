//! The write/compaction half of a database's behavior is kept behind a trait so that
//! [`InnerGenericDB`](super::InnerGenericDB) itself stays agnostic to *how* writes are committed
//! and compactions are scheduled; the only concrete implementor lives in
//! [`crate::background_worker`]-backed production code, while tests may plug in a dummy `()`
//! implementation that always errors (see the crate's internal read-only test harness).

use std::collections::HashSet;
use std::fmt::Debug;

use crate::format::FileNumber;
use crate::format::UserKey;
use crate::leveldb_generics::{LdbFullShared, LdbLockedFullShared, LevelDBGenerics};
use crate::write_batch::WriteBatch;


/// Splits into a `Shared` half (read under no lock, alongside the rest of [`DBShared`]) and a
/// `SharedMutable` half (read/written under the database-wide lock, alongside the rest of
/// [`DBSharedMutable`]), the same way the rest of a database's shared state is split.
///
/// [`DBShared`]: super::DBShared
/// [`DBSharedMutable`]: super::DBSharedMutable
pub(crate) trait DBWriteImpl<LDBG: LevelDBGenerics>: Sized + Debug {
    type Shared: Debug;
    type SharedMutable: Debug;

    /// Split `self` into its two halves, to be stored inside a freshly-built database.
    fn split(self) -> (Self::Shared, Self::SharedMutable);

    /// Called once, immediately after a database has finished opening, with the database-wide
    /// lock already held. Used to e.g. spawn the background worker thread and kick off any
    /// compactions the recovered version needs.
    fn initialize(shared: LdbLockedFullShared<'_, LDBG, Self>);

    /// Commit `write_batch` to the write-ahead log and the active memtable.
    fn write(
        shared:      LdbFullShared<'_, LDBG, Self>,
        options:     (),
        write_batch: &WriteBatch,
    ) -> Result<(), ()>;

    /// Called after a write or memtable-size check observes that the active memtable should be
    /// swapped out and flushed; does not block on the flush completing.
    fn compact_memtable(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()>;

    /// Manually compact the key range `[lower_bound, upper_bound]` (unbounded on either side if
    /// `None`), blocking until every affected level has been compacted.
    fn compact_range(
        shared:      LdbFullShared<'_, LDBG, Self>,
        lower_bound: Option<UserKey<'_>>,
        upper_bound: Option<UserKey<'_>>,
    ) -> Result<(), ()>;

    /// Compact every level down to the bottom, blocking until finished.
    fn compact_full(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()>;

    /// With the database-wide lock already held, start a compaction if the current version
    /// needs one and no compaction is already running. Must not block on the compaction
    /// finishing.
    fn maybe_start_compaction(shared: LdbLockedFullShared<'_, LDBG, Self>);

    /// Block the calling thread until any in-progress compaction finishes.
    fn wait_for_compaction_to_finish(shared: LdbFullShared<'_, LDBG, Self>);

    /// File numbers currently allocated as the output of an in-progress compaction or flush,
    /// which must not be deleted as "obsolete" even though no live [`Version`](crate::version::Version)
    /// references them yet.
    fn pending_compaction_outputs(shared: LdbFullShared<'_, LDBG, Self>) -> HashSet<FileNumber>;

    /// Stop accepting new writes and compactions, returning once any in-progress compaction has
    /// been aborted.
    fn close_writes(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()>;

    /// Stop accepting new writes, but let any in-progress compaction run to completion first.
    fn close_writes_after_compaction(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()>;
}
