//! Core put/delete/write/get/flush operations.
//!
//! Committing a batch to the write-ahead log and memtable, and scheduling the resulting flush,
//! is delegated entirely to [`DBWriteImpl::write`]/[`DBWriteImpl::compact_memtable`]; this module
//! is only responsible for turning the public key/value surface into a [`WriteBatch`], checking
//! [`ReadWriteStatus`], and resolving reads against the memtable(s) and current [`Version`].

use generic_container::FragileContainer as _;

use crate::{
    containers::FragileRwCell as _,
    error::{Error, ErrorCode, Result},
    file_tracking::{MaybeSeekCompaction, StartSeekCompaction},
    format::{InternalEntry, LookupKey, UserKey},
    snapshot::Snapshot,
    write_batch::WriteBatch,
};
use crate::leveldb_generics::{FastClone as _, LdbReadTableOptions, LevelDBGenerics};
use super::super::{db_data::ReadWriteStatus, write_impl::DBWriteImpl};
use super::InnerGenericDB;


/// Options accepted by [`InnerGenericDB::put_with`], [`InnerGenericDB::delete_with`], and
/// [`InnerGenericDB::write_with`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteOptions {
    /// Whether to wait for the write-ahead log record to be synced to stable storage before
    /// returning. Ignored until the production [`DBWriteImpl`] implementor grows sync support;
    /// tracked here so the public signature does not need to change later.
    pub sync: bool,
}

/// Options accepted by [`InnerGenericDB::get_with`].
pub(crate) struct ReadOptions<LDBG: LevelDBGenerics> {
    /// Read as of this snapshot's sequence number rather than the database's latest sequence
    /// number.
    pub snapshot: Option<Snapshot<LDBG::Refcounted, LDBG::RwCell>>,
}

impl<LDBG: LevelDBGenerics> Default for ReadOptions<LDBG> {
    #[inline]
    fn default() -> Self {
        Self { snapshot: None }
    }
}

fn resolve_entry(entry: InternalEntry<'_>) -> Option<Vec<u8>> {
    if entry.entry_type.is_tombstone() {
        None
    } else {
        entry.value.map(|value| value.0.to_vec())
    }
}

#[expect(unreachable_pub, reason = "control visibility at type definition")]
impl<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>> InnerGenericDB<LDBG, WriteImpl> {
    #[inline]
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_with(key, value, WriteOptions::default())
    }

    pub fn put_with(&self, key: &[u8], value: &[u8], options: WriteOptions) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write_with(&batch, options)
    }

    #[inline]
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.delete_with(key, WriteOptions::default())
    }

    pub fn delete_with(&self, key: &[u8], options: WriteOptions) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write_with(&batch, options)
    }

    #[inline]
    pub fn write(&self, batch: &WriteBatch) -> Result<()> {
        self.write_with(batch, WriteOptions::default())
    }

    pub fn write_with(&self, batch: &WriteBatch, _options: WriteOptions) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.shared_mutable().read().readwrite_status.check_writable()?;

        WriteImpl::write(self.ldb_shared(), (), batch)
            .map_err(|()| Error::new(ErrorCode::IOError, "failed to commit write batch"))
    }

    /// Force the active memtable to be swapped out and scheduled for a flush; does not block
    /// until the flush finishes.
    pub fn flush(&self) -> Result<()> {
        WriteImpl::compact_memtable(self.ldb_shared())
            .map_err(|()| Error::new(ErrorCode::IOError, "failed to schedule a flush"))
    }

    #[inline]
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_with(key, &ReadOptions::default())
    }

    pub fn get_with(&self, key: &[u8], options: &ReadOptions<LDBG>) -> Result<Option<Vec<u8>>> {
        let shared_mutable = self.shared_mutable().read();
        if let ReadWriteStatus::Closed = &shared_mutable.readwrite_status {
            return Err(Error::new(ErrorCode::ClosedError, "database is closed"));
        }

        let sequence_number = match &options.snapshot {
            Some(snapshot) => snapshot.sequence_number(),
            None => shared_mutable.version_set.last_sequence(),
        };

        let mut lookup_buffer = Vec::new();
        let lookup_key = LookupKey::new(&mut lookup_buffer, UserKey(key), sequence_number);

        if let Some(entry) = shared_mutable.current_memtable.get(lookup_key) {
            return Ok(resolve_entry(entry));
        }
        if let Some(memtable_under_compaction) = &shared_mutable.memtable_under_compaction {
            if let Some(entry) = memtable_under_compaction.get(lookup_key) {
                return Ok(resolve_entry(entry));
            }
        }

        let version = shared_mutable.version_set.cloned_current_version();
        drop(shared_mutable);

        let read_opts: LdbReadTableOptions<LDBG> = self.shared().table_options.fast_clone();
        let (table_entry, maybe_seek_compaction) = version.get_ref().get::<LDBG>(
            &self.shared().filesystem.filesystem,
            &self.shared().db_directory,
            self.cmp(),
            &self.shared().table_cache,
            &read_opts,
            lookup_key,
        ).map_err(|()| Error::corruption("failed to read a table file"))?;

        if let MaybeSeekCompaction::Some(level, file) = maybe_seek_compaction {
            self.maybe_start_seek_compaction(&version, StartSeekCompaction { level, file });
        }

        match table_entry {
            None => Ok(None),
            Some(table_entry) => {
                let encoded_key = crate::format::EncodedInternalKey(table_entry.key());
                let internal_key = crate::format::InternalKey::decode(encoded_key)
                    .map_err(|()| Error::corruption("found an invalid internal key in a table file"))?;

                if internal_key.entry_type.is_tombstone() {
                    Ok(None)
                } else {
                    Ok(Some(table_entry.value().to_vec()))
                }
            }
        }
    }
}
