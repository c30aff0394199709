use std::fmt::{Debug, Formatter, Result as FmtResult};

use seekable_iterator::{CursorLendingIterator as _, Seekable as _};

use crate::table_traits::adapters::InternalComparator;
use crate::leveldb_generics::{LdbTableContainer, LdbTableIter, LevelDBGenerics};

/// A table iterator that may or may not currently have a table set; used by level iterators to
/// avoid reallocating an iterator every time they move to a new table file.
///
/// While unset, it still remembers the comparator it would use once a table is [`Self::set`],
/// so a level iterator can construct one before it knows which file (if any) it will first
/// point at.
pub(crate) struct OptionalTableIter<LDBG: LevelDBGenerics> {
    cmp:  InternalComparator<LDBG::Cmp>,
    iter: Option<LdbTableIter<LDBG>>,
}

#[expect(unreachable_pub, reason = "control visibility at type definition")]
impl<LDBG: LevelDBGenerics> OptionalTableIter<LDBG> {
    #[must_use]
    pub fn new_empty(cmp: InternalComparator<LDBG::Cmp>) -> Self {
        Self { cmp, iter: None }
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.iter.is_some()
    }

    pub fn clear(&mut self) {
        self.iter = None;
    }

    pub fn set(&mut self, table: LdbTableContainer<LDBG>) {
        self.iter = Some(LdbTableIter::<LDBG>::new(table));
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        self.iter.as_ref().is_some_and(CursorLendingIterator::valid)
    }

    pub fn next(&mut self) -> Option<(&[u8], &[u8])> {
        self.iter.as_mut()?.next()
    }

    #[must_use]
    pub fn current(&self) -> Option<(&[u8], &[u8])> {
        self.iter.as_ref()?.current()
    }

    pub fn prev(&mut self) -> Option<(&[u8], &[u8])> {
        self.iter.as_mut()?.prev()
    }

    pub fn reset(&mut self) {
        if let Some(iter) = &mut self.iter {
            iter.reset();
        }
    }

    pub fn seek(&mut self, min_bound: &[u8]) {
        if let Some(iter) = &mut self.iter {
            iter.seek(min_bound);
        }
    }

    pub fn seek_before(&mut self, strict_upper_bound: &[u8]) {
        if let Some(iter) = &mut self.iter {
            iter.seek_before(strict_upper_bound);
        }
    }

    pub fn seek_to_first(&mut self) {
        if let Some(iter) = &mut self.iter {
            iter.seek_to_first();
        }
    }

    pub fn seek_to_last(&mut self) {
        if let Some(iter) = &mut self.iter {
            iter.seek_to_last();
        }
    }
}

impl<LDBG> Debug for OptionalTableIter<LDBG>
where
    LDBG:      LevelDBGenerics,
    LDBG::Cmp: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OptionalTableIter")
            .field("cmp", &self.cmp)
            .field("set", &self.iter.is_some())
            .finish()
    }
}
