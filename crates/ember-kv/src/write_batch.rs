//! An ordered, appendable log of write operations, as described in the data model: a batch
//! carries a single base sequence number assigned at commit, and operation `i` within the batch
//! is assigned sequence `base + i`.

use std::io::Write as _;

use integer_encoding::VarIntWriter as _;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::public_format::{EntryType, LengthPrefixedBytes, WriteEntry};


/// Tag bytes prefixing each operation in a [`WriteBatch`]'s internal representation.
/// These intentionally match [`EntryType`]'s discriminants so that decoding a batch's entries
/// and decoding entries read back off disk share the same `EntryType::try_from(u8)` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum OpTag {
    Deletion       = EntryType::Deletion as u8,
    SingleDeletion = EntryType::SingleDeletion as u8,
    Merge          = EntryType::Merge as u8,
    RangeDeletion  = EntryType::RangeDeletion as u8,
    Value          = EntryType::Value as u8,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Concatenation of `[tag: u8, key: LengthPrefixedBytes, payload?: LengthPrefixedBytes]`
    /// per operation, in append order.
    rep:   Vec<u8>,
    count: u32,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self { rep: Vec::new(), count: 0 }
    }

    #[inline]
    fn push_prefixed(&mut self, data: &[u8]) {
        self.rep.write_varint(u32::try_from(data.len()).expect("key/value too long")).unwrap();
        self.rep.write_all(data).unwrap();
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.rep.push(OpTag::Value as u8);
        self.push_prefixed(key);
        self.push_prefixed(value);
        self.count += 1;
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.rep.push(OpTag::Deletion as u8);
        self.push_prefixed(key);
        self.count += 1;
    }

    pub fn single_delete(&mut self, key: &[u8]) {
        self.rep.push(OpTag::SingleDeletion as u8);
        self.push_prefixed(key);
        self.count += 1;
    }

    /// A no-op for an empty range (`start == end`), per the boundary behavior that
    /// `delete_range(a, a)` must not record an operation.
    pub fn delete_range(&mut self, start_key: &[u8], end_key: &[u8]) {
        if start_key == end_key {
            return;
        }
        self.rep.push(OpTag::RangeDeletion as u8);
        self.push_prefixed(start_key);
        self.push_prefixed(end_key);
        self.count += 1;
    }

    pub fn merge(&mut self, key: &[u8], operand: &[u8]) {
        self.rep.push(OpTag::Merge as u8);
        self.push_prefixed(key);
        self.push_prefixed(operand);
        self.count += 1;
    }

    /// The number of operations recorded in this batch. Each gets its own sequence number
    /// at commit time.
    #[inline]
    #[must_use]
    pub fn length(&self) -> u32 {
        self.count
    }

    /// Same as [`Self::length`], named to match the field recovery code reads off a write-ahead
    /// log record header.
    #[inline]
    #[must_use]
    pub(crate) fn num_entries(&self) -> u32 {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn clear(&mut self) {
        self.rep.clear();
        self.count = 0;
    }

    /// Serialized bytes of the batch body (no sequence header); this is what gets length-prefixed
    /// and handed to the write-ahead log, and what the MemtableWriteAccess replays.
    #[inline]
    #[must_use]
    pub(crate) fn rep(&self) -> &[u8] {
        &self.rep
    }

    /// Truncates this batch back to its first `count` operations, used by savepoint rollback.
    pub(crate) fn truncate_to(&mut self, count: u32) {
        if count >= self.count {
            return;
        }
        let mut iter = self.iter();
        for _ in 0..count {
            iter.next().expect("count does not exceed self.count");
        }
        self.rep.truncate(iter.offset());
        self.count = count;
    }

    /// Iterate the recorded operations in order, yielding borrowed [`WriteEntry`] views.
    #[must_use]
    pub(crate) fn iter(&self) -> WriteBatchIter<'_> {
        WriteBatchIter { rep: &self.rep, offset: 0 }
    }

    /// Append another batch's operations to the end of this one, preserving order.
    pub(crate) fn append(&mut self, other: &WriteBatch) {
        self.rep.extend_from_slice(&other.rep);
        self.count += other.count;
    }
}

/// The raw pieces of a [`WriteBatch`] as read off a write-ahead log or MANIFEST record, before
/// the claimed entry count has been checked against what the body actually decodes to.
pub(crate) struct UnvalidatedWriteBatch {
    pub(crate) num_entries:        u32,
    pub(crate) headerless_entries: Vec<u8>,
}

impl UnvalidatedWriteBatch {
    /// Checks that `headerless_entries` decodes into exactly `num_entries` operations with no
    /// leftover bytes, so that a record corrupted in a way that still passes its checksum
    /// (e.g. truncated mid-record by a non-atomic write) cannot be replayed as a different,
    /// shorter batch than the one that was committed.
    pub(crate) fn into_validated(self) -> Result<WriteBatch, ()> {
        let Self { num_entries, headerless_entries } = self;
        let batch = WriteBatch { rep: headerless_entries, count: num_entries };

        let mut iter = batch.iter();
        for _ in 0..num_entries {
            iter.next().ok_or(())?;
        }
        if iter.offset() != batch.rep.len() {
            return Err(());
        }

        Ok(batch)
    }
}

pub(crate) struct WriteBatchIter<'a> {
    rep:    &'a [u8],
    offset: usize,
}

impl<'a> WriteBatchIter<'a> {
    #[inline]
    #[must_use]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for WriteBatchIter<'a> {
    type Item = WriteEntry<'a>;

    fn next(&mut self) -> Option<WriteEntry<'a>> {
        let remaining = self.rep.get(self.offset..)?;
        let (&tag_byte, after_tag) = remaining.split_first()?;
        let entry_type = EntryType::try_from(tag_byte).ok()?;

        let key = LengthPrefixedBytes::parse(after_tag).ok()?;
        let after_key = &after_tag[key.prefixed_data().len()..];

        let entry = match entry_type {
            EntryType::Deletion => WriteEntry::Deletion { key },
            EntryType::SingleDeletion => WriteEntry::SingleDeletion { key },
            EntryType::Value | EntryType::Merge | EntryType::RangeDeletion => {
                let payload = LengthPrefixedBytes::parse(after_key).ok()?;
                let after_payload_len = payload.prefixed_data().len();
                self.offset += 1 + key.prefixed_data().len() + after_payload_len;

                return Some(match entry_type {
                    EntryType::Value => WriteEntry::Value { key, value: payload },
                    EntryType::Merge => WriteEntry::Merge { key, operand: payload },
                    EntryType::RangeDeletion => {
                        WriteEntry::RangeDeletion { start_key: key, end_key: payload }
                    }
                    EntryType::Deletion | EntryType::SingleDeletion => unreachable!(),
                });
            }
        };

        self.offset += 1 + key.prefixed_data().len();
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch() {
        let batch = WriteBatch::new();
        assert_eq!(batch.length(), 0);
        assert!(batch.is_empty());
        assert!(batch.iter().next().is_none());
    }

    #[test]
    fn put_delete_round_trip() {
        let mut batch = WriteBatch::new();
        batch.put(b"a", b"1");
        batch.delete(b"b");
        batch.single_delete(b"c");
        batch.merge(b"d", b"+1");
        batch.delete_range(b"e", b"f");

        assert_eq!(batch.length(), 5);

        let entries: Vec<_> = batch.iter().collect();
        assert_eq!(entries.len(), 5);
        match entries[0] {
            WriteEntry::Value { key, value } => {
                assert_eq!(key.data(), b"a");
                assert_eq!(value.data(), b"1");
            }
            _ => panic!("expected Value"),
        }
        match entries[1] {
            WriteEntry::Deletion { key } => assert_eq!(key.data(), b"b"),
            _ => panic!("expected Deletion"),
        }
        match entries[2] {
            WriteEntry::SingleDeletion { key } => assert_eq!(key.data(), b"c"),
            _ => panic!("expected SingleDeletion"),
        }
        match entries[3] {
            WriteEntry::Merge { key, operand } => {
                assert_eq!(key.data(), b"d");
                assert_eq!(operand.data(), b"+1");
            }
            _ => panic!("expected Merge"),
        }
        match entries[4] {
            WriteEntry::RangeDeletion { start_key, end_key } => {
                assert_eq!(start_key.data(), b"e");
                assert_eq!(end_key.data(), b"f");
            }
            _ => panic!("expected RangeDeletion"),
        }
    }

    #[test]
    fn delete_range_empty_is_noop() {
        let mut batch = WriteBatch::new();
        batch.delete_range(b"same", b"same");
        assert_eq!(batch.length(), 0);
        assert!(batch.is_empty());
    }

    #[test]
    fn clear_resets_batch() {
        let mut batch = WriteBatch::new();
        batch.put(b"a", b"1");
        batch.clear();
        assert_eq!(batch.length(), 0);
        assert!(batch.iter().next().is_none());
    }

    #[test]
    fn truncate_to_drops_trailing_ops() {
        let mut batch = WriteBatch::new();
        batch.put(b"a", b"1");
        batch.put(b"b", b"2");
        batch.put(b"c", b"3");
        batch.truncate_to(1);
        assert_eq!(batch.length(), 1);
        let entries: Vec<_> = batch.iter().collect();
        assert_eq!(entries.len(), 1);
        match entries[0] {
            WriteEntry::Value { key, .. } => assert_eq!(key.data(), b"a"),
            _ => panic!("expected Value"),
        }
    }

    #[test]
    fn append_preserves_order() {
        let mut a = WriteBatch::new();
        a.put(b"a", b"1");
        let mut b = WriteBatch::new();
        b.put(b"b", b"2");
        a.append(&b);
        assert_eq!(a.length(), 2);
        let keys: Vec<_> = a.iter().map(|e| e.key().data().to_vec()).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
