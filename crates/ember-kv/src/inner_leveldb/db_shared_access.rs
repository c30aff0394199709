//! A restricted view of a database, handed to table-file iterators so that they can open table
//! files and trigger seek compactions without being able to write to, or close, the database.

use std::path::Path;

use clone_behavior::{MirroredClone, Speed};

use crate::{
    file_tracking::StartSeekCompaction,
    leveldb_generics::{
        FastClone as _, LdbContainer, LdbFsCell, LdbReadTableOptions, LdbTableOptions,
        LevelDBGenerics,
    },
    table_traits::adapters::InternalComparator,
    version::version_struct::Version,
};
use super::{generic_db::InnerGenericDB, write_impl::DBWriteImpl};


/// Thin, `#[repr(transparent)]` wrapper around [`InnerGenericDB`] exposing only the bits of
/// shared state needed to read table files and report read samples: the filesystem, table cache,
/// table options, and comparator, plus a way to (re)trigger a seek compaction. Table-file
/// iterators hold this instead of the full [`InnerGenericDB`] so that they cannot accidentally
/// write to, or close, the database they're reading from.
#[repr(transparent)]
pub(crate) struct DBSharedAccess<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>>(
    InnerGenericDB<LDBG, WriteImpl>,
);

impl<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>> DBSharedAccess<LDBG, WriteImpl> {
    /// Reinterpret a reference to an [`InnerGenericDB`] as a reference to this narrower view.
    #[inline]
    #[must_use]
    pub const fn from_ref(db: &InnerGenericDB<LDBG, WriteImpl>) -> &Self {
        // SAFETY: `Self` is `#[repr(transparent)]` around `InnerGenericDB<LDBG, WriteImpl>`,
        // with no other fields, so the two types share a layout.
        unsafe { &*(std::ptr::from_ref(db).cast::<Self>()) }
    }

    #[inline]
    #[must_use]
    pub fn filesystem(&self) -> &LdbFsCell<LDBG> {
        &self.0.shared().filesystem.filesystem
    }

    #[inline]
    #[must_use]
    pub fn db_directory(&self) -> &Path {
        &self.0.shared().db_directory
    }

    #[inline]
    #[must_use]
    pub fn table_cache(&self) -> &LDBG::TableCache {
        &self.0.shared().table_cache
    }

    #[inline]
    #[must_use]
    pub fn table_options(&self) -> &LdbTableOptions<LDBG> {
        &self.0.shared().table_options
    }

    #[inline]
    #[must_use]
    pub fn read_table_options(&self) -> LdbReadTableOptions<LDBG> {
        self.0.shared().table_options.fast_clone()
    }

    #[inline]
    #[must_use]
    pub fn comparator(&self) -> &InternalComparator<LDBG::Cmp> {
        self.0.cmp()
    }

    /// See [`InnerGenericDB::maybe_start_seek_compaction`].
    #[inline]
    #[must_use]
    pub fn maybe_start_seek_compaction(
        &self,
        maybe_current_version: &LdbContainer<LDBG, Version<LDBG::Refcounted>>,
        start_seek_compaction: StartSeekCompaction<LDBG::Refcounted>,
    ) -> bool {
        self.0.maybe_start_seek_compaction(maybe_current_version, start_seek_compaction)
    }

    /// The underlying database; used to construct an [`IterReadSampler`](crate::read_sampling::IterReadSampler),
    /// which needs an owned, clonable handle to the whole database rather than this narrower view.
    #[inline]
    #[must_use]
    pub fn db(&self) -> &InnerGenericDB<LDBG, WriteImpl> {
        &self.0
    }
}

impl<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>, S: Speed> MirroredClone<S>
for DBSharedAccess<LDBG, WriteImpl>
{
    #[inline]
    fn mirrored_clone(&self) -> Self {
        Self(self.0.mirrored_clone())
    }
}
