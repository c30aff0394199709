use std::cmp::Ordering;

use clone_behavior::{IndependentClone, MirroredClone, Speed};
use seekable_iterator::Comparator;

use ember_sstable::options::{FilterPolicy as SSTableFilterPolicy, TableComparator};

use crate::format::{EncodedInternalKey, EncodedMemtableEntry, InternalKey, SequenceNumber};
use crate::public_format::EntryType;
use super::trait_equivalents::{FilterPolicy, LevelDBComparator};


/// Orders encoded internal keys (user key followed by an 8 byte sequence/type tag) by
/// the wrapped user key comparator, breaking ties by sorting the tag in decreasing order.
///
/// This means that, among entries sharing a user key, greater sequence numbers (and, for
/// equal sequence numbers, greater [`EntryType`] values) sort first.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InternalComparator<Cmp>(pub(crate) Cmp);

impl<Cmp: LevelDBComparator> InternalComparator<Cmp> {
    /// Compare two user keys directly, using the wrapped comparator, without considering any
    /// internal key tag.
    pub(crate) fn cmp_user(&self, lhs: crate::format::UserKey<'_>, rhs: crate::format::UserKey<'_>) -> Ordering {
        self.0.cmp(lhs.0, rhs.0)
    }

    /// Compare two decoded internal keys: ascending by user key, then descending by
    /// `(sequence_number, entry_type)`, matching [`Self::cmp_internal_keys`]'s ordering.
    pub(crate) fn cmp_internal(&self, lhs: InternalKey<'_>, rhs: InternalKey<'_>) -> Ordering {
        self.0.cmp(lhs.user_key.0, rhs.user_key.0)
            .then_with(|| rhs.tag().cmp(&lhs.tag()))
    }

    fn cmp_internal_keys(&self, lhs: EncodedInternalKey<'_>, rhs: EncodedInternalKey<'_>) -> Ordering {
        let Ok(lhs_user_key) = lhs.user_key() else { return Ordering::Equal };
        let Ok(rhs_user_key) = rhs.user_key() else { return Ordering::Equal };

        self.0.cmp(lhs_user_key.0, rhs_user_key.0)
            .then_with(|| {
                // Decreasing order of (sequence_number, entry_type): equivalent to a
                // reversed numeric comparison of the packed tag.
                let lhs_tag = InternalKey::decode(lhs).map(|key| key.tag());
                let rhs_tag = InternalKey::decode(rhs).map(|key| key.tag());
                rhs_tag.ok().cmp(&lhs_tag.ok())
            })
    }
}

impl<Cmp: LevelDBComparator> TableComparator for InternalComparator<Cmp> {
    fn cmp(&self, lhs: &[u8], rhs: &[u8]) -> Ordering {
        self.cmp_internal_keys(EncodedInternalKey(lhs), EncodedInternalKey(rhs))
    }

    fn find_short_separator(&self, from: &[u8], to: &[u8], separator: &mut Vec<u8>) {
        let Ok(from_user_key) = EncodedInternalKey(from).user_key() else {
            separator.extend(from);
            return;
        };
        let Ok(to_user_key) = EncodedInternalKey(to).user_key() else {
            separator.extend(from);
            return;
        };

        let mut shortened = from_user_key.0.to_vec();
        self.0.find_short_separator(from_user_key.0, to_user_key.0, &mut shortened);

        if shortened.len() < from_user_key.0.len()
            && self.0.cmp(from_user_key.0, &shortened).is_lt()
        {
            let internal_key = InternalKey {
                user_key:        crate::format::UserKey(&shortened),
                sequence_number: SequenceNumber::MAX_SEQUENCE_NUMBER,
                entry_type:      EntryType::MAX_TYPE,
            };
            internal_key.append_encoded(separator);
        } else {
            separator.extend(from);
        }
    }

    fn find_short_successor(&self, key: &[u8], successor: &mut Vec<u8>) {
        let Ok(user_key) = EncodedInternalKey(key).user_key() else {
            successor.extend(key);
            return;
        };

        let mut shortened = user_key.0.to_vec();
        self.0.find_short_successor(user_key.0, &mut shortened);

        if shortened.len() < user_key.0.len()
            && self.0.cmp(user_key.0, &shortened).is_lt()
        {
            let internal_key = InternalKey {
                user_key:        crate::format::UserKey(&shortened),
                sequence_number: SequenceNumber::MAX_SEQUENCE_NUMBER,
                entry_type:      EntryType::MAX_TYPE,
            };
            internal_key.append_encoded(successor);
        } else {
            successor.extend(key);
        }
    }
}

impl<Cmp, S> MirroredClone<S> for InternalComparator<Cmp>
where
    Cmp: MirroredClone<S>,
    S:   Speed,
{
    #[inline]
    fn mirrored_clone(&self) -> Self {
        Self(self.0.mirrored_clone())
    }
}

impl<Cmp, S> IndependentClone<S> for InternalComparator<Cmp>
where
    Cmp: IndependentClone<S>,
    S:   Speed,
{
    #[inline]
    fn independent_clone(&self) -> Self {
        Self(self.0.independent_clone())
    }
}

/// Wraps a user-facing [`FilterPolicy`] so that it builds and probes filters over the user key
/// portion of internal keys, rather than over the whole (user key, sequence, type) tuple.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InternalFilterPolicy<Policy>(pub(crate) Policy);

impl<Policy: FilterPolicy> SSTableFilterPolicy for InternalFilterPolicy<Policy> {
    #[inline]
    fn name(&self) -> &'static [u8] {
        self.0.name()
    }

    fn create_filter(&self, flattened_keys: &[u8], key_offsets: &[usize], filter: &mut Vec<u8>) {
        let mut user_keys = Vec::with_capacity(flattened_keys.len());
        let mut user_key_offsets = Vec::with_capacity(key_offsets.len());

        let bounds = key_offsets.iter().copied()
            .chain(std::iter::once(flattened_keys.len()));
        let mut start = 0;

        for end in bounds.skip(1) {
            #[expect(clippy::indexing_slicing, reason = "offsets come from the caller's own key list")]
            let internal_key = &flattened_keys[start..end];
            let user_key = EncodedInternalKey(internal_key).user_key()
                .map_or(internal_key, |user_key| user_key.0);

            user_key_offsets.push(user_keys.len());
            user_keys.extend(user_key);
            start = end;
        }

        self.0.create_filter(&user_keys, &user_key_offsets, filter);
    }

    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> bool {
        let user_key = EncodedInternalKey(key).user_key().map_or(key, |user_key| user_key.0);
        self.0.key_may_match(user_key, filter)
    }
}

impl<Policy, S> MirroredClone<S> for InternalFilterPolicy<Policy>
where
    Policy: MirroredClone<S>,
    S:      Speed,
{
    #[inline]
    fn mirrored_clone(&self) -> Self {
        Self(self.0.mirrored_clone())
    }
}

impl<Policy, S> IndependentClone<S> for InternalFilterPolicy<Policy>
where
    Policy: IndependentClone<S>,
    S:      Speed,
{
    #[inline]
    fn independent_clone(&self) -> Self {
        Self(self.0.independent_clone())
    }
}

/// Orders raw skiplist entries (see [`EncodedMemtableEntry`]) by the internal key each entry
/// begins with: ascending by user key, then descending by `(sequence_number, entry_type)`.
///
/// Both full [`EncodedMemtableEntry`] slices and bare length-prefixed internal key slices (as
/// used for seek bounds) compare correctly, since [`EncodedMemtableEntry::encoded_internal_key`]
/// only ever looks at the leading length-prefixed segment of the slice it's given.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MemtableComparator<Cmp>(pub(crate) Cmp);

impl<Cmp: LevelDBComparator> Comparator<[u8]> for MemtableComparator<Cmp> {
    fn cmp(&self, lhs: &[u8], rhs: &[u8]) -> Ordering {
        let lhs = EncodedMemtableEntry::new_unchecked(lhs).encoded_internal_key();
        let rhs = EncodedMemtableEntry::new_unchecked(rhs).encoded_internal_key();

        let Ok(lhs_user_key) = lhs.user_key() else { return Ordering::Equal };
        let Ok(rhs_user_key) = rhs.user_key() else { return Ordering::Equal };

        self.0.cmp(lhs_user_key.0, rhs_user_key.0)
            .then_with(|| {
                let lhs_tag = InternalKey::decode(lhs).map(|key| key.tag());
                let rhs_tag = InternalKey::decode(rhs).map(|key| key.tag());
                rhs_tag.ok().cmp(&lhs_tag.ok())
            })
    }
}

impl<Cmp, S> MirroredClone<S> for MemtableComparator<Cmp>
where
    Cmp: MirroredClone<S>,
    S:   Speed,
{
    #[inline]
    fn mirrored_clone(&self) -> Self {
        Self(self.0.mirrored_clone())
    }
}
