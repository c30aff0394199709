pub(crate) mod trait_equivalents;
mod implementors;
pub(crate) mod adapters;


pub(crate) use self::adapters::{InternalComparator, InternalFilterPolicy, MemtableComparator};
pub use self::{
    implementors::{BloomPolicy, BytewiseComparator},
    trait_equivalents::{FILTER_KEYS_LENGTH_LIMIT, FilterPolicy, LevelDBComparator},
};
