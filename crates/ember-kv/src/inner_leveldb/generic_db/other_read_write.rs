use std::path::Path;

use clone_behavior::MirroredClone as _;

use ember_vfs::traits::ReadableFilesystem as _;

use crate::{
    checkpoint::{self, CheckpointLogFile, CheckpointPlan},
    database_files::LevelDBFileName,
    error::{Error, ErrorCode, Result},
    file_tracking::StartSeekCompaction,
    format::{SequenceNumber, UserKey},
    read_sampling::IterReadSampler,
    snapshot::{Snapshot, SnapshotList},
    version::Version,
};
use crate::{
    containers::{FragileRwCell as _, RwCellFamily as _},
    leveldb_generics::{LdbContainer, LdbLockedFullShared, LevelDBGenerics},
    leveldb_iter::{InnerGenericDBIter, InternalIter},
};
use super::super::write_impl::DBWriteImpl;
use super::put_delete_get::ReadOptions;
use super::InnerGenericDB;


// Temporary
impl<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>> InnerGenericDB<LDBG, WriteImpl> {
    pub(crate) fn testing_iter(&self) -> InnerGenericDBIter<LDBG, WriteImpl> {
        Self::iter_without_sampler(&self.ldb_locked_shared(), self)
    }
}

#[expect(unreachable_pub, reason = "control visibility at type definition")]
impl<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>> InnerGenericDB<LDBG, WriteImpl> {
    #[inline]
    #[must_use]
    pub fn iter(&self) -> InnerGenericDBIter<LDBG, WriteImpl> {
        self.iter_with(&ReadOptions::default())
    }

    #[must_use]
    pub fn iter_with(&self, options: &ReadOptions<LDBG>) -> InnerGenericDBIter<LDBG, WriteImpl> {
        let sequence_number_override = options.snapshot.as_ref().map(Snapshot::sequence_number);
        let this_clone = self.fast_mirrored_clone();
        let mut locked_full_shared = self.ldb_locked_shared();
        Self::iter_with_sampler(&mut locked_full_shared, this_clone, sequence_number_override)
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot<LDBG::Refcounted, LDBG::RwCell> {
        let shared_mutable = self.shared_mutable().read();
        let sequence_number = shared_mutable.version_set.last_sequence();

        #[expect(
            clippy::unwrap_used,
            reason = "a freshly observed sequence number is never older than an existing snapshot",
        )]
        SnapshotList::get_snapshot(&shared_mutable.snapshot_list, sequence_number).unwrap()
    }

    /// Manually compact the key range `[lower_bound, upper_bound]` (unbounded on either side if
    /// `None`), blocking until every affected level has been compacted.
    pub fn compact_range(
        &self,
        lower_bound: Option<UserKey<'_>>,
        upper_bound: Option<UserKey<'_>>,
    ) -> Result<()> {
        WriteImpl::compact_range(self.ldb_shared(), lower_bound, upper_bound)
            .map_err(|()| Error::new(ErrorCode::IOError, "failed to compact the requested range"))
    }

    /// Compact every level down to the bottom, blocking until finished.
    pub fn compact_full(&self) -> Result<()> {
        WriteImpl::compact_full(self.ldb_shared())
            .map_err(|()| Error::new(ErrorCode::IOError, "failed to run a full compaction"))
    }

    /// Create a consistent, hard-linked-where-possible snapshot of this database's directory at
    /// `dest_dir`, which must not already exist.
    ///
    /// Log files larger than `log_size_for_flush` bytes are left out of the checkpoint, on the
    /// theory that replaying them during the checkpoint's own recovery is no more expensive than
    /// copying them; pass `0` to force a full flush first and skip copying any log at all.
    pub fn checkpoint(&self, dest_dir: &Path, log_size_for_flush: u64) -> Result<()> {
        if log_size_for_flush == 0 {
            self.flush()?;
        }

        let (shared, mut shared_mutable) = self.ldb_locked_shared();

        let live_table_files     = shared_mutable.version_set.live_files().into_iter().collect();
        let manifest_file_number = shared_mutable.version_set.manifest_file_number();
        let log_number           = shared_mutable.version_set.log_number();

        let log_path = LevelDBFileName::Log { file_number: log_number }
            .file_path(&shared.db_directory);
        let log_size = shared.filesystem.filesystem.read().size_of(&log_path).unwrap_or(0);

        let log_files = if log_size <= log_size_for_flush {
            vec![CheckpointLogFile { file_number: log_number, size: log_size }]
        } else {
            Vec::new()
        };

        let plan = CheckpointPlan { live_table_files, manifest_file_number, log_files };

        checkpoint::create(&shared.db_directory, dest_dir, &plan)
            .map_err(|err| Error::new(ErrorCode::IOError, err.to_string()))
    }

    #[must_use]
    pub fn has_outstanding_snapshots(&self) -> bool {
        self.shared_mutable().read().snapshot_list.read().oldest_sequence_number().is_some()
    }

    /// Whether any iterator or pending read is keeping a version other than the current one
    /// alive, or is holding the current version itself.
    #[must_use]
    pub fn has_outstanding_iters(&self) -> bool {
        let mut shared_mutable = self.shared_mutable().write();
        shared_mutable.version_set.has_outstanding_old_versions()
            || !shared_mutable.version_set.current_version_is_exclusively_held()
    }
}

// Internal-ish utils
#[expect(unreachable_pub, reason = "control visibility at type definition")]
impl<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>> InnerGenericDB<LDBG, WriteImpl> {
    /// Calling this method requires a lock on the database, in addition to a reference-counted
    /// clone of the database. Methods called on the returned iterator may acquire locks on the
    /// database.
    #[must_use]
    fn iter_with_sampler(
        this:                     &mut LdbLockedFullShared<'_, LDBG, WriteImpl>,
        this_clone:               Self,
        sequence_number_override: Option<SequenceNumber>,
    ) -> InnerGenericDBIter<LDBG, WriteImpl> {
        let iters = Self::internal_iters(this, &this_clone);

        let cmp = this.0.table_options.comparator.fast_mirrored_clone();
        let sequence_number = sequence_number_override
            .unwrap_or_else(|| this.1.version_set.last_sequence());
        let version = this.1.version_set.cloned_current_version();

        let seed = this.1.iter_read_sample_seed;
        this.1.iter_read_sample_seed = seed.wrapping_add(1);
        let sampler = IterReadSampler::new(this_clone, seed);

        InnerGenericDBIter::new(cmp, Some(sampler), sequence_number, version, iters)
    }

    /// Calling this method requires a lock on the database, in addition to a reference-counted
    /// clone of the database. Methods called on the returned iterator will never acquire
    /// database-wide locks.
    #[must_use]
    fn iter_without_sampler(
        this:       &LdbLockedFullShared<'_, LDBG, WriteImpl>,
        this_clone: &Self,
    ) -> InnerGenericDBIter<LDBG, WriteImpl> {
        let iters = Self::internal_iters(this, this_clone);

        let cmp = this.0.table_options.comparator.fast_mirrored_clone();
        let sequence_number = this.1.version_set.last_sequence();
        let version = this.1.version_set.cloned_current_version();

        InnerGenericDBIter::new(cmp, None, sequence_number, version, iters)
    }

    #[must_use]
    fn internal_iters(
        this:       &LdbLockedFullShared<'_, LDBG, WriteImpl>,
        this_clone: &Self,
    ) -> Vec<InternalIter<LDBG, WriteImpl>> {
        let mut iters = Vec::new();

        iters.push(InternalIter::Memtable(
            this.1.current_memtable
                .fast_mirrored_clone()
                .lending_iter(),
        ));

        if let Some(memtable_under_compaction) = &this.1.memtable_under_compaction {
            iters.push(InternalIter::Memtable(
                memtable_under_compaction.fast_mirrored_clone().lending_iter(),
            ));
        }

        let current_version = this.1.version_set.current();
        let version_container = current_version.refcounted_version().fast_mirrored_clone();
        current_version.add_iterators(this_clone.shared_access(), &version_container, &mut iters);

        iters
    }

    /// If the current version needs a seek compaction, attempts to start a compaction.
    ///
    /// This function returns `true` if and only if the provided version is the current version.
    ///
    /// This function acquires a database-wide lock.
    #[must_use]
    pub fn maybe_start_seek_compaction(
        &self,
        maybe_current_version: &LdbContainer<LDBG, Version<LDBG::Refcounted>>,
        start_seek_compaction: StartSeekCompaction<LDBG::Refcounted>,
    ) -> bool {
        let mut locked_full_shared = self.ldb_locked_shared();
        let needs_compaction = locked_full_shared
            .1
            .version_set
            .needs_seek_compaction(maybe_current_version, start_seek_compaction);

        if needs_compaction.needs_seek_compaction {
            WriteImpl::maybe_start_compaction(locked_full_shared);
        }

        needs_compaction.version_is_current
    }
}
