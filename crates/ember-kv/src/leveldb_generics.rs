use clone_behavior::{ConstantTime, Fast, MirroredClone};

use ember_sstable::{ReadTableOptions, Table, TableBuilder, TableEntry, TableIter, TableOptions, WriteTableOptions};
use ember_sstable::options::{BlockCacheKey, BufferPool, CompressorList, KVCache};
use ember_vfs::traits::{ReadableFilesystem, WritableFilesystem};

use crate::{memtable::MemtableSkiplist, table_file::TableCacheKey};
use crate::{
    table_traits::{
        adapters::{InternalComparator, InternalFilterPolicy},
        trait_equivalents::{FilterPolicy, LevelDBComparator},
    },
    containers::{FragileRwCell as _, RefcountedFamily, RwCellFamily},
};

use generic_container::kinds::ArcKind;
use ember_pool::{PooledBuffer, SharedUnboundedBufferPool};
use ember_sstable::SyncQuickCache;
use ember_vfs::StandardFS;
use crate::{
    memtable::SyncMemtableSkiplist,
    table_traits::{BloomPolicy, BytewiseComparator},
    containers::{DebugWrapper, RwLockKind},
};


pub(crate) trait LevelDBGenerics {
    type Refcounted: RefcountedFamily;
    type RwCell:     RwCellFamily;

    type FS:         WritableFilesystem;
    type Skiplist:   MemtableSkiplist<Self::Cmp>;
    type Policy:     FilterPolicy + MirroredClone<ConstantTime>;
    type Cmp:        LevelDBComparator + MirroredClone<ConstantTime>;
    type Logger;
    type BlockCache: KVCache<BlockCacheKey, <Self::Pool as BufferPool>::PooledBuffer>;
    type TableCache: KVCache<TableCacheKey, LdbTableContainer<Self>>;
    type Pool:       BufferPool + MirroredClone<ConstantTime>;
    // LoggerConstructor <- best to just be `dyn`
    // CompactorHandle
}

impl<
    Refcounted, RwCell, FS, Skiplist, Policy, Cmp, Logger,
    BlockCache, TableCache, Pool,
> LevelDBGenerics
for (
    Refcounted, RwCell, FS, Skiplist, Policy, Cmp, Logger,
    BlockCache, TableCache, Pool,
)
where
    Refcounted: RefcountedFamily,
    RwCell:     RwCellFamily,
    FS:         WritableFilesystem,
    Skiplist:   MemtableSkiplist<Cmp>,
    Policy:     FilterPolicy + MirroredClone<ConstantTime>,
    Cmp:        LevelDBComparator + MirroredClone<ConstantTime>,
    Logger:,
    BlockCache: KVCache<BlockCacheKey, <Pool as BufferPool>::PooledBuffer>,
    TableCache: KVCache<
        TableCacheKey,
        Refcounted::Container<Table<
            Refcounted::Container<CompressorList>,
            InternalFilterPolicy<Policy>,
            InternalComparator<Cmp>,
            FS::RandomAccessFile,
            BlockCache,
            Pool,
        >,
    >>,
    Pool:       BufferPool + MirroredClone<ConstantTime>,
{
    type Refcounted = Refcounted;
    type RwCell     = RwCell;
    type FS         = FS;
    type Skiplist   = Skiplist;
    type Policy     = Policy;
    type Cmp        = Cmp;
    type Logger     = Logger;
    type BlockCache = BlockCache;
    type TableCache = TableCache;
    type Pool       = Pool;
}

pub(crate) type LdbContainer<LDBG, T>
    = <<LDBG as LevelDBGenerics>::Refcounted as RefcountedFamily>::Container<T>;
pub(crate) type LdbRwCell<LDBG, T>
    = <<LDBG as LevelDBGenerics>::RwCell as RwCellFamily>::Cell<T>;
pub(crate) type LdbMutContainer<LDBG, T> = LdbContainer<LDBG, LdbRwCell<LDBG, T>>;
pub(crate) type LdbFsCell<LDBG> = LdbRwCell<LDBG, <LDBG as LevelDBGenerics>::FS>;
pub(crate) type LdbCompressorList<LDBG> = LdbContainer<LDBG, CompressorList>;
pub(crate) type LdbFsError<LDBG>  = <<LDBG as LevelDBGenerics>::FS as ReadableFilesystem>::Error;
pub(crate) type Lockfile<LDBG> = <<LDBG as LevelDBGenerics>::FS as ReadableFilesystem>::Lockfile;
pub(crate) type LdbTableContainer<LDBG> = LdbContainer<
    LDBG,
    Table<
        LdbCompressorList<LDBG>,
        InternalFilterPolicy<<LDBG as LevelDBGenerics>::Policy>,
        InternalComparator<<LDBG as LevelDBGenerics>::Cmp>,
        <<LDBG as LevelDBGenerics>::FS as ReadableFilesystem>::RandomAccessFile,
        <LDBG as LevelDBGenerics>::BlockCache,
        <LDBG as LevelDBGenerics>::Pool,
    >,
>;
pub(crate) type LdbTableBuilder<LDBG> = TableBuilder<
    LdbCompressorList<LDBG>,
    InternalFilterPolicy<<LDBG as LevelDBGenerics>::Policy>,
    InternalComparator<<LDBG as LevelDBGenerics>::Cmp>,
    <<LDBG as LevelDBGenerics>::FS as WritableFilesystem>::WriteFile,
>;
pub(crate) type LdbTableEntry<LDBG>
    = TableEntry<<<LDBG as LevelDBGenerics>::Pool as BufferPool>::PooledBuffer>;
pub(crate) type LdbTableOptions<LDBG> = TableOptions<
    LdbCompressorList<LDBG>,
    InternalFilterPolicy<<LDBG as LevelDBGenerics>::Policy>,
    InternalComparator<<LDBG as LevelDBGenerics>::Cmp>,
    <LDBG as LevelDBGenerics>::BlockCache,
    <LDBG as LevelDBGenerics>::Pool,
>;
pub(crate) type LdbReadTableOptions<LDBG> = ReadTableOptions<
    LdbCompressorList<LDBG>,
    InternalFilterPolicy<<LDBG as LevelDBGenerics>::Policy>,
    InternalComparator<<LDBG as LevelDBGenerics>::Cmp>,
    <LDBG as LevelDBGenerics>::BlockCache,
    <LDBG as LevelDBGenerics>::Pool,
>;
pub(crate) type LdbWriteTableOptions<LDBG> = WriteTableOptions<
    LdbCompressorList<LDBG>,
    InternalFilterPolicy<<LDBG as LevelDBGenerics>::Policy>,
    InternalComparator<<LDBG as LevelDBGenerics>::Cmp>,
>;

pub(crate) type LdbLockfile<LDBG> = <<LDBG as LevelDBGenerics>::FS as ReadableFilesystem>::Lockfile;
pub(crate) type LdbWriteFile<LDBG>
    = <<LDBG as LevelDBGenerics>::FS as WritableFilesystem>::WriteFile;

pub(crate) type LdbPooledBuffer<LDBG>
    = <<LDBG as LevelDBGenerics>::Pool as BufferPool>::PooledBuffer;
/// The buffer type backing a [`TableEntry`], currently the same as [`LdbPooledBuffer`].
pub(crate) type LdbDataBuffer<LDBG> = LdbPooledBuffer<LDBG>;

pub(crate) type LdbSnapshotList<LDBG> = LdbMutContainer<
    LDBG,
    crate::snapshot::SnapshotList<<LDBG as LevelDBGenerics>::Refcounted, <LDBG as LevelDBGenerics>::RwCell>,
>;

pub(crate) type LdbTableIter<LDBG> = TableIter<
    LdbCompressorList<LDBG>,
    InternalFilterPolicy<<LDBG as LevelDBGenerics>::Policy>,
    InternalComparator<<LDBG as LevelDBGenerics>::Cmp>,
    <<LDBG as LevelDBGenerics>::FS as ReadableFilesystem>::RandomAccessFile,
    <LDBG as LevelDBGenerics>::BlockCache,
    <LDBG as LevelDBGenerics>::Pool,
    LdbTableContainer<LDBG>,
>;
/// A table iterator that may or may not currently have a table set; used by level iterators to
/// avoid reallocating an iterator every time they move to a new table file.
pub(crate) type LdbOptionalTableIter<LDBG> = crate::table_file::OptionalTableIter<LDBG>;
pub(crate) type LdbTable<LDBG> = LdbTableContainer<LDBG>;

/// A pair of the immutable shared data and the mutable shared data of a database.
pub(crate) type LdbFullShared<'a, LDBG, WriteImpl> = (
    &'a crate::inner_leveldb::DBShared<LDBG, WriteImpl>,
    &'a LdbRwCell<LDBG, crate::inner_leveldb::DBSharedMutable<LDBG, WriteImpl>>,
);
/// Like [`LdbFullShared`], but with the mutable shared data already locked for writing.
/// Cheaply clones `Self` (using [`MirroredClone<Fast>`] for every refcounted field, rather than
/// a deep clone) into a `Target`, which may be `Self` itself or a related, smaller type.
///
/// Used to cheaply obtain a [`LdbReadTableOptions`] from a [`LdbTableOptions`] (or another
/// [`LdbReadTableOptions`]) without requiring every field to implement [`Clone`], which a
/// derived `Clone` impl would otherwise demand even of fields the caller never touches.
pub(crate) trait FastClone<Target = Self> {
    fn fast_clone(&self) -> Target;
}

impl<LDBG: LevelDBGenerics> FastClone for LdbTableOptions<LDBG> {
    fn fast_clone(&self) -> Self {
        Self {
            compressor_list:        self.compressor_list.mirrored_clone(),
            selected_compressor:    self.selected_compressor,
            filter_policy:          self.filter_policy.as_ref().map(MirroredClone::mirrored_clone),
            comparator:             self.comparator.mirrored_clone(),
            block_restart_interval: self.block_restart_interval,
            block_size:             self.block_size,
            verify_checksums:       self.verify_checksums,
            block_cache:            self.block_cache.mirrored_clone(),
            buffer_pool:            self.buffer_pool.mirrored_clone(),
        }
    }
}

impl<LDBG: LevelDBGenerics> FastClone<LdbReadTableOptions<LDBG>> for LdbTableOptions<LDBG> {
    fn fast_clone(&self) -> LdbReadTableOptions<LDBG> {
        ReadTableOptions {
            compressor_list:  self.compressor_list.mirrored_clone(),
            filter_policy:    self.filter_policy.as_ref().map(MirroredClone::mirrored_clone),
            comparator:       self.comparator.mirrored_clone(),
            verify_checksums: self.verify_checksums,
            block_cache:      self.block_cache.mirrored_clone(),
            buffer_pool:      self.buffer_pool.mirrored_clone(),
        }
    }
}

impl<LDBG: LevelDBGenerics> FastClone for LdbReadTableOptions<LDBG> {
    fn fast_clone(&self) -> Self {
        Self {
            compressor_list:  self.compressor_list.mirrored_clone(),
            filter_policy:    self.filter_policy.as_ref().map(MirroredClone::mirrored_clone),
            comparator:       self.comparator.mirrored_clone(),
            verify_checksums: self.verify_checksums,
            block_cache:      self.block_cache.mirrored_clone(),
            buffer_pool:      self.buffer_pool.mirrored_clone(),
        }
    }
}

pub(crate) type LdbLockedFullShared<'a, LDBG, WriteImpl> = (
    &'a crate::inner_leveldb::DBShared<LDBG, WriteImpl>,
    <LdbRwCell<LDBG, crate::inner_leveldb::DBSharedMutable<LDBG, WriteImpl>> as crate::containers::FragileRwCell<
        crate::inner_leveldb::DBSharedMutable<LDBG, WriteImpl>,
    >>::RefMut<'a>,
);

/// The [`Table`] type backing a thread-safe [`SyncLDBG`]'s table cache.
type SyncTable = Table<
    <ArcKind as RefcountedFamily>::Container<CompressorList>,
    InternalFilterPolicy<BloomPolicy>,
    InternalComparator<BytewiseComparator>,
    <StandardFS as ReadableFilesystem>::RandomAccessFile,
    SyncQuickCache<BlockCacheKey, DebugWrapper<ArcKind, PooledBuffer<SharedUnboundedBufferPool>>>,
    SharedUnboundedBufferPool,
>;

/// The thread-safe [`LevelDBGenerics`] tuple backing [`crate::database::Database`]: `Arc`-based
/// refcounting, `RwLock`-based locking (so concurrent readers never block each other), a real
/// filesystem, and `quick_cache`-backed block/table caches that may be shared and queried from
/// multiple threads. Uses `quick_cache` rather than `moka` because the latter is only pulled in
/// behind this crate's optional `moka-caches` feature (enabled for the single-threaded test
/// harness in `read_test.rs`), while `quick-caches` is always available.
///
/// The `Logger` slot (position 7 of the 10-tuple) is unused crate-wide (see the tuple `impl` of
/// [`LevelDBGenerics`] above), so it is filled with `()` the same way the test harness's
/// `UnsyncLDBG` (`read_test.rs`) does.
pub(crate) type SyncLDBG = (
    ArcKind,
    RwLockKind,
    StandardFS,
    SyncMemtableSkiplist<BytewiseComparator>,
    BloomPolicy,
    BytewiseComparator,
    (),
    SyncQuickCache<BlockCacheKey, DebugWrapper<ArcKind, PooledBuffer<SharedUnboundedBufferPool>>>,
    SyncQuickCache<TableCacheKey, DebugWrapper<ArcKind, SyncTable>>,
    SharedUnboundedBufferPool,
);
