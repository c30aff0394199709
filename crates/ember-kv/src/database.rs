//! The public, thread-safe embedded-database facade.
//!
//! [`Database`] wraps [`InnerGenericDB`] with the production [`SyncLDBG`] generics tuple
//! (`Arc` refcounting, `RwLock` locking, a real filesystem, `quick_cache`-backed block/table
//! caches) and the synchronous [`LiveWriteImpl`] write path, and exposes the crate's stable,
//! non-generic entry point: [`Database::open`], `put`/`get`/`delete`/`write`, `flush`,
//! `iter`/`snapshot`, `compact_range`/`compact_full`, and a handful of read-only debug/inspection
//! methods (`check_corruption`, `num_files_at_level`, `file_summary_text`/`_hex`) consumed by the
//! `ember-inspector` binary.

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;

use generic_container::kinds::ArcKind;
use quick_cache::sync::Cache as QuickSyncCache;

use ember_pool::SharedUnboundedBufferPool;
use ember_sstable::{SyncQuickCache, TableOptions};
use ember_sstable::options::CompressorList;
use ember_vfs::StandardFS;

use crate::{
    containers::RwLockKind,
    corruption_handler::{CorruptionHandler, InternalCorruptionHandler},
    error::{Error, ErrorCode, Result},
    file_tracking::SeeksBetweenCompactionOptions,
    format::UserKey,
    info_logger::InfoLogger,
    inner_leveldb::{InitOptions, InnerDBOptions, InnerGenericDB, LiveWriteImpl, ReadOptions},
    leveldb_generics::{LdbTableOptions, SyncLDBG},
    leveldb_iter::InnerGenericDBIter,
    snapshot::Snapshot,
    table_traits::{BloomPolicy, BytewiseComparator, InternalComparator, InternalFilterPolicy},
    write_batch::WriteBatch,
};


/// A handle to an open database. Cheap to clone: every clone shares the same underlying state
/// through `Arc`, and the crate's internal locking lets reads from different clones proceed
/// without blocking each other.
#[derive(Clone)]
pub struct Database(InnerGenericDB<SyncLDBG, LiveWriteImpl>);

/// A point-in-time view of a [`Database`], usable with [`Database::get_at`] and
/// [`Database::iter_at`] to read a consistent snapshot even as later writes land.
pub struct DatabaseSnapshot(Snapshot<ArcKind, RwLockKind>);

/// A handle to the live entries of a [`Database`] (or one of its snapshots), sorted by key.
///
/// Lending-style: [`DatabaseIter::next`] and [`DatabaseIter::prev`] borrow from the iterator
/// itself (the returned key/value are only valid until the next call), so this type does not
/// implement [`Iterator`]. Call [`Self::next_owned`] for an owned `(Vec<u8>, Vec<u8>)` pair
/// instead, if the borrow is inconvenient.
pub struct DatabaseIter(InnerGenericDBIter<SyncLDBG, LiveWriteImpl>);

/// Configuration for [`Database::open`].
///
/// Every field has a default via [`DatabaseOptions::default`]; most callers only need to
/// override `create_if_missing`/`error_if_exists` (for the first-run/must-not-exist cases) and
/// possibly `write_buffer_size`.
#[expect(clippy::struct_excessive_bools, reason = "the options are given clear names")]
#[derive(Debug, Clone, Copy)]
pub struct DatabaseOptions {
    /// Create the database directory and an empty database if one does not already exist.
    pub create_if_missing: bool,
    /// Fail [`Database::open`] if a database already exists at the given path.
    pub error_if_exists: bool,
    /// Number of bytes of writes (approximately) to buffer across the active and any immutable
    /// memtable before a writer is stalled to let a flush catch up.
    pub write_buffer_size: u64,
    /// Number of bytes a single memtable is allowed to grow to before it is swapped out and
    /// flushed.
    pub memtable_size_limit: usize,
    /// Soft limit on the size of write-ahead log, table, and manifest files.
    pub file_size_limit: u64,
    /// Number of bytes of reads between read-sampling-driven seek-compaction checks.
    pub iter_read_sample_period: u32,
    /// Target size of each SST data block, before compression.
    pub block_size: usize,
    /// Number of entries between restart points in an SST data block.
    pub block_restart_interval: usize,
    /// Bits of Bloom-filter data to store per key; `0` disables the filter.
    pub bloom_bits_per_key: u8,
    /// Verify block checksums on every table read.
    pub verify_checksums: bool,
    /// Maximum number of decompressed blocks kept in the shared block cache.
    pub block_cache_capacity: usize,
    /// Maximum number of open tables kept in the shared table cache.
    pub table_cache_capacity: usize,
    /// Buffers larger than this (in bytes) are discarded, rather than retained, when returned
    /// to the shared buffer pool.
    pub pool_max_buffer_capacity: usize,
    /// Whether automatic flush/compaction scheduling should run as memtables and levels grow.
    ///
    /// Flushes already run synchronously on the write path regardless of this setting; it only
    /// gates [`WriteController`](crate::write_controller::WriteController) stalling heuristics,
    /// since background compaction is not implemented yet (see `DESIGN.md`).
    pub perform_automatic_compactions: bool,
    /// Try to continue appending to an existing MANIFEST file rather than always rewriting one
    /// on open.
    pub try_reuse_manifest: bool,
    /// Try to continue appending to an existing write-ahead log file rather than always
    /// rotating to a new one on open.
    pub try_reuse_write_ahead_log: bool,
    /// Run the (more expensive) consistency checks on the version set recovered at open time,
    /// and on every version edit applied afterwards.
    pub verify_integrity: bool,
    /// Thresholds for triggering a seek-driven compaction on a file that absorbs too many
    /// unnecessary reads.
    pub seek_options: SeeksBetweenCompactionOptions,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            create_if_missing:             true,
            error_if_exists:                false,
            write_buffer_size:              4 << 20,
            memtable_size_limit:            4 << 20,
            file_size_limit:                2 << 20,
            iter_read_sample_period:        1 << 20,
            block_size:                     4096,
            block_restart_interval:         16,
            bloom_bits_per_key:             10,
            verify_checksums:               true,
            block_cache_capacity:           8192,
            table_cache_capacity:           1000,
            pool_max_buffer_capacity:       64 << 10,
            perform_automatic_compactions:  true,
            try_reuse_manifest:             true,
            try_reuse_write_ahead_log:      true,
            verify_integrity:               true,
            seek_options:                   SeeksBetweenCompactionOptions {
                min_allowed_seeks:   100,
                #[expect(clippy::unwrap_used, reason = "16 KiB is nonzero")]
                file_bytes_per_seek: NonZeroU32::new(16 << 10).unwrap(),
            },
        }
    }
}

impl DatabaseOptions {
    fn table_options(self) -> LdbTableOptions<SyncLDBG> {
        TableOptions {
            compressor_list:        Arc::new(CompressorList::new_without_compressors()),
            selected_compressor:    0,
            filter_policy:          (self.bloom_bits_per_key > 0)
                .then(|| InternalFilterPolicy(BloomPolicy::new(self.bloom_bits_per_key))),
            comparator:             InternalComparator(BytewiseComparator),
            block_restart_interval: self.block_restart_interval,
            block_size:             self.block_size,
            verify_checksums:       self.verify_checksums,
            block_cache:            SyncQuickCache(
                Arc::new(QuickSyncCache::new(self.block_cache_capacity)),
            ),
            buffer_pool:            SharedUnboundedBufferPool::new(self.pool_max_buffer_capacity),
        }
    }

    fn db_options(self) -> InnerDBOptions {
        InnerDBOptions {
            verify_recovered_version_set:  self.verify_integrity,
            verify_new_versions:           self.verify_integrity,
            try_reuse_manifest:            self.try_reuse_manifest,
            try_reuse_write_ahead_log:     self.try_reuse_write_ahead_log,
            seek_options:                  self.seek_options,
            iter_read_sample_period:       self.iter_read_sample_period,
            file_size_limit:               self.file_size_limit,
            memtable_size_limit:           self.memtable_size_limit,
            perform_automatic_compactions: self.perform_automatic_compactions,
            create_if_missing:             self.create_if_missing,
            error_if_exists:               self.error_if_exists,
        }
    }
}

impl Database {
    /// Open (or create) a database at `path`.
    ///
    /// Uses a corruption handler that only records that a corruption occurred (queryable through
    /// the eventual surfaced `Error`s), without otherwise notifying anything external. Use
    /// [`Self::open_with_corruption_handler`] to be notified as soon as a corruption is observed,
    /// from a background thread, rather than only upon the next failing read.
    pub fn open(path: impl AsRef<Path>, options: DatabaseOptions) -> Result<Self> {
        Self::open_inner(path, options, InternalCorruptionHandler::test_new())
    }

    /// Open (or create) a database at `path`, invoking `handler` the first time on-disk
    /// corruption is observed.
    ///
    /// ## Potential Panics or Deadlocks
    /// Do not call methods on this (or any) `Database` from within `handler`'s
    /// [`CorruptionHandler::corruption`]; the handler may run while a database-wide lock is held.
    pub fn open_with_corruption_handler<H: CorruptionHandler + 'static>(
        path:    impl AsRef<Path>,
        options: DatabaseOptions,
        handler: H,
    ) -> Result<Self> {
        Self::open_inner(path, options, InternalCorruptionHandler::new(handler))
    }

    fn open_inner(
        path:               impl AsRef<Path>,
        options:            DatabaseOptions,
        corruption_handler: InternalCorruptionHandler<ArcKind, RwLockKind>,
    ) -> Result<Self> {
        let init_options = InitOptions {
            db_directory:   path.as_ref().to_path_buf(),
            table_cache:    SyncQuickCache(
                Arc::new(QuickSyncCache::new(options.table_cache_capacity)),
            ),
            table_options:  options.table_options(),
            db_options:     options.db_options(),
            corruption_handler,
            info_logger:    InfoLogger::new_without_log_file(),
            write_impl:     LiveWriteImpl { write_buffer_size: options.write_buffer_size },
        };

        let filesystem = std::sync::RwLock::new(StandardFS);
        InnerGenericDB::open(init_options, filesystem)
            .map(Self)
            .map_err(|()| Error::new(ErrorCode::IOError, "failed to open database"))
    }

    /// Insert or overwrite the value associated with `key`.
    #[inline]
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.0.put(key, value)
    }

    /// Remove `key`, if present.
    #[inline]
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.0.delete(key)
    }

    /// Atomically apply every operation recorded in `batch`.
    #[inline]
    pub fn write(&self, batch: &WriteBatch) -> Result<()> {
        self.0.write(batch)
    }

    /// Look up the current value of `key`, if any.
    #[inline]
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.0.get(key)
    }

    /// Look up the value of `key` as of `snapshot` rather than as of now.
    pub fn get_at(&self, key: &[u8], snapshot: &DatabaseSnapshot) -> Result<Option<Vec<u8>>> {
        self.0.get_with(key, &ReadOptions { snapshot: Some(snapshot.0.clone()) })
    }

    /// Force the active memtable to be swapped out and flushed to a new SST file.
    #[inline]
    pub fn flush(&self) -> Result<()> {
        self.0.flush()
    }

    /// Iterate over every live entry, in key order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> DatabaseIter {
        DatabaseIter(self.0.iter())
    }

    /// Iterate over every entry live as of `snapshot`, in key order.
    #[must_use]
    pub fn iter_at(&self, snapshot: &DatabaseSnapshot) -> DatabaseIter {
        DatabaseIter(self.0.iter_with(&ReadOptions { snapshot: Some(snapshot.0.clone()) }))
    }

    /// Pin the database's current state so it can still be read after later writes land.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> DatabaseSnapshot {
        DatabaseSnapshot(self.0.snapshot())
    }

    /// Manually compact the key range `[lower_bound, upper_bound]` (unbounded on either side if
    /// `None`), blocking until every affected level has been merged into one new run.
    pub fn compact_range(&self, lower_bound: Option<&[u8]>, upper_bound: Option<&[u8]>) -> Result<()> {
        self.0.compact_range(lower_bound.map(UserKey), upper_bound.map(UserKey))
    }

    /// Compact every level down to the bottom, blocking until finished.
    #[inline]
    pub fn compact_full(&self) -> Result<()> {
        self.0.compact_full()
    }

    /// Create a consistent, hard-linked-where-possible snapshot of this database's directory at
    /// `dest_dir`, which must not already exist. The result is itself a valid database directory,
    /// openable with [`Self::open`].
    ///
    /// Log files larger than `log_size_for_flush` bytes are left out of the checkpoint, on the
    /// theory that replaying them during the checkpoint's own recovery is no more expensive than
    /// copying them; pass `0` to force a full flush first and skip copying any log at all.
    #[inline]
    pub fn checkpoint(&self, dest_dir: impl AsRef<Path>, log_size_for_flush: u64) -> Result<()> {
        self.0.checkpoint(dest_dir.as_ref(), log_size_for_flush)
    }

    /// If the database has observed a corruption error severe enough to prevent further reads or
    /// writes, return it.
    #[inline]
    #[must_use]
    pub fn check_corruption(&self) -> Option<Error> {
        self.0.check_corruption()
    }

    /// The number of table files belonging to the given level (0-indexed) of the current version.
    ///
    /// Returns `None` if `level` is not a valid level index.
    #[inline]
    #[must_use]
    pub fn num_files_at_level(&self, level: u8) -> Option<usize> {
        self.0.num_files_at_level(level)
    }

    /// A one-line-per-file summary of the current version's table files, with keys rendered as
    /// lossy UTF-8 text.
    #[must_use]
    pub fn file_summary_text(&self) -> String {
        struct Summary<'a>(&'a Database);
        impl std::fmt::Display for Summary<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.0.file_summary_with_text_keys(f)
            }
        }
        Summary(self).to_string()
    }

    /// A one-line-per-file summary of the current version's table files, with keys rendered as
    /// hexadecimal bytes.
    #[must_use]
    pub fn file_summary_hex(&self) -> String {
        struct Summary<'a>(&'a Database);
        impl std::fmt::Display for Summary<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.0.file_summary_with_numeric_keys(f)
            }
        }
        Summary(self).to_string()
    }
}

impl DatabaseIter {
    /// Whether the iterator currently points at an entry.
    #[inline]
    #[must_use]
    pub fn valid(&self) -> bool {
        self.0.valid()
    }

    /// Advance to, and return, the next entry in key order.
    #[inline]
    pub fn next(&mut self) -> Option<(&[u8], &[u8])> {
        self.0.next().map(|(key, value)| (key.0, value.0))
    }

    /// Advance to, and return, an owned copy of the next entry in key order.
    pub fn next_owned(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        self.next().map(|(key, value)| (key.to_vec(), value.to_vec()))
    }

    /// Move back to, and return, the previous entry in key order.
    #[inline]
    pub fn prev(&mut self) -> Option<(&[u8], &[u8])> {
        self.0.prev().map(|(key, value)| (key.0, value.0))
    }

    /// Move the iterator to the first entry at or after `min_bound`.
    #[inline]
    pub fn seek(&mut self, min_bound: &[u8]) {
        self.0.seek(UserKey(min_bound));
    }

    /// Move the iterator to the first entry.
    #[inline]
    pub fn seek_to_first(&mut self) {
        self.0.seek_to_first();
    }

    /// Move the iterator to the last entry.
    #[inline]
    pub fn seek_to_last(&mut self) {
        self.0.seek_to_last();
    }
}
