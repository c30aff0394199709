#![cfg_attr(docsrs, feature(doc_cfg))]

mod comparator;
mod filters;
// Reason this is pub: there's a bunch of constants and traits that will not usually be needed.
// They need to be public, but need not be in the crate root.
pub mod compressors;
mod utils;

mod block;
mod filter_block;

mod pool;
mod caches;
mod option_structs;

/// Convenience re-exports of the cache- and pool-related types most often needed together when
/// parameterizing a [`table::Table`] for throughput.
pub mod perf_options {
    pub use crate::caches::{BlockCacheKey, KVCache};
    #[cfg(feature = "moka-caches")]
    pub use crate::caches::UnsyncMokaCache;
    pub use crate::pool::BufferPool;
}

/// Convenience re-exports of the types needed to configure a [`table::Table`].
pub mod options {
    pub use crate::caches::{BlockCacheKey, KVCache};
    pub use crate::comparator::TableComparator;
    pub use crate::compressors::CompressorList;
    pub use crate::filters::FilterPolicy;
    pub use crate::pool::BufferPool;
}

/// Convenience re-export of the compressor list, under the name used by on-disk table format
/// documentation.
pub mod format_options {
    pub use crate::compressors::CompressorList;
}

/// Convenience re-export of the internal comparator adapter, under the path some callers expect.
pub mod adapters {
    pub use crate::comparator::ComparatorAdapter;
}

// Temporarily public, to silence errors.
pub mod table;


pub use self::block::{
    Block, BlockBuilder, BlockContentsContainer,
    BlockIterImpl, BlockIterImplPieces, BorrowedBlockIter, OwnedBlockIter, OwnedBlockIterPieces,
    TableBlock,
};
pub use self::caches::{BlockCacheKey, KVCache, NoCache};
#[cfg(feature = "moka-caches")]
pub use self::caches::{SyncMokaCache, UnsyncMokaCache};
#[cfg(feature = "quick-caches")]
pub use self::caches::{SyncQuickCache, UnsyncQuickCache};
pub use self::comparator::{
    ComparatorAdapter, DefaultComparator, DefaultComparatorID, MetaindexComparator, TableComparator,
};
pub use self::compressors::{Compressor, CompressorList};
pub use self::filters::{
    BloomPolicy, BloomPolicyName, FILTER_KEYS_LENGTH_LIMIT, FilterPolicy, NoFilterPolicy,
};
pub use self::filter_block::{FilterBlockBuilder, FilterBlockReader};
pub use self::option_structs::{ReadTableOptions as OptionReadTableOptions, TableOptions, WriteTableOptions as OptionWriteTableOptions};
pub use self::pool::BufferPool;
pub use self::table::{ReadTableOptions, Table, TableBuilder, TableEntry, TableIter, WriteTableOptions};


// TODO: provide functions that can rigorously validate the data of blocks, filter blocks,
// etc, so that I don't feel guilty about letting the normal implementations panic.
// Someone who's concerned about corruption can do the paranoid checks.


// getrandom is unused directly within this crate, but used as a recursive dependency via:
// sorted_vector_map -> quickcheck -> rand -> rand_core -> getrandom 0.2.x
// moka -> uuid -> getrandom 0.3.x
// This silences an "unused dependency" lint.
#[cfg(target_family = "wasm")]
use getrandom2 as _;
#[cfg(target_family = "wasm")]
use uuid as _;
