use integer_encoding::VarInt as _;


#[derive(Debug, Clone, Copy)]
pub enum WriteEntry<'a> {
    Value {
        key:   LengthPrefixedBytes<'a>,
        value: LengthPrefixedBytes<'a>,
    },
    Deletion {
        key:   LengthPrefixedBytes<'a>,
    },
    SingleDeletion {
        key:   LengthPrefixedBytes<'a>,
    },
    Merge {
        key:      LengthPrefixedBytes<'a>,
        operand:  LengthPrefixedBytes<'a>,
    },
    /// A deletion of the half-open range `[start_key, end_key)`. The internal key's user key is
    /// `start_key`; `end_key` is carried as the entry's payload, the same way `Value`'s payload
    /// carries the value.
    RangeDeletion {
        start_key: LengthPrefixedBytes<'a>,
        end_key:   LengthPrefixedBytes<'a>,
    },
}

impl WriteEntry<'_> {
    #[inline]
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        match self {
            Self::Value { .. }          => EntryType::Value,
            Self::Deletion { .. }       => EntryType::Deletion,
            Self::SingleDeletion { .. } => EntryType::SingleDeletion,
            Self::Merge { .. }          => EntryType::Merge,
            Self::RangeDeletion { .. }  => EntryType::RangeDeletion,
        }
    }

    /// The length-prefixed payload that follows the internal key in an encoded entry, if any.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<LengthPrefixedBytes<'_>> {
        match self {
            Self::Value { value, .. }         => Some(*value),
            Self::Merge { operand, .. }       => Some(*operand),
            Self::RangeDeletion { end_key, .. } => Some(*end_key),
            Self::Deletion { .. } | Self::SingleDeletion { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> LengthPrefixedBytes<'_> {
        match self {
            Self::Value { key, .. }
            | Self::Deletion { key }
            | Self::SingleDeletion { key }
            | Self::Merge { key, .. } => *key,
            Self::RangeDeletion { start_key, .. } => *start_key,
        }
    }
}

/// The kind tag stored in the low byte of an internal key's `seq_and_type_tag`.
///
/// Ordering of the discriminants only matters as a tiebreak between two internal keys sharing
/// the same user key and sequence number, which cannot occur for entries minted by this crate
/// (every operation in a batch gets a distinct sequence number) but can occur for a synthetic
/// lookup key, which always uses [`EntryType::MAX_TYPE`] so that it sorts before every real entry
/// at the same sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntryType {
    Deletion       = 0,
    SingleDeletion = 1,
    Merge          = 2,
    RangeDeletion  = 3,
    Value          = 4,
}

impl EntryType {
    pub(crate) const MIN_TYPE: Self = Self::Deletion;
    pub(crate) const MAX_TYPE: Self = Self::Value;

    /// Whether this kind shadows (and is shadowed by) older versions of the same user key the
    /// way a point tombstone does, as opposed to carrying mergeable/queryable payload data.
    #[inline]
    #[must_use]
    pub fn is_tombstone(self) -> bool {
        matches!(self, Self::Deletion | Self::SingleDeletion)
    }
}

impl From<EntryType> for u8 {
    #[inline]
    fn from(entry_type: EntryType) -> Self {
        entry_type as u8
    }
}

impl TryFrom<u8> for EntryType {
    type Error = ();

    #[inline]
    fn try_from(entry_type: u8) -> Result<Self, Self::Error> {
        match entry_type {
            0 => Ok(Self::Deletion),
            1 => Ok(Self::SingleDeletion),
            2 => Ok(Self::Merge),
            3 => Ok(Self::RangeDeletion),
            4 => Ok(Self::Value),
            _ => Err(()),
        }
    }
}

/// A `LengthPrefixedBytes` value is a reference to a byte slice formed from the concatenation of:
/// - `data_len`, a varint32 used as a length prefix,
/// - `data`, a byte slice of the length indicated by the varint32.
///
/// Values are verified on construction, so consumers of `LengthPrefixedBytes` values can
/// assume that they are valid.
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct LengthPrefixedBytes<'a>(&'a [u8]);

impl<'a> LengthPrefixedBytes<'a> {
    /// Attempts to parse data from the start of `src` into a `LengthPrefixedBytes` value.
    ///
    /// If possible, a `data_len` varint32 is parsed from the start of `src`. If there are
    /// at least `data_len` bytes in `src` following the varint32, then the first `data_len`
    /// bytes are used to form a `data` slice, and a `LengthPrefixedBytes` value wrapping
    /// the varint32 and `data` slice is returned.
    ///
    /// This may fail if `src` does not begin with a valid varint32, or if `src` is not long enough
    /// to have `data_len` bytes following the parsed `data_len` varint32.
    pub fn parse(src: &'a [u8]) -> Result<Self, ()> {
        // TODO: do not rely on integer_encoding, I don't like how it ignores some errors
        // and necessitates an extra check to see whether what it tells me is true.
        let (bytes_len, varint_len) = u32::decode_var(src).ok_or(())?;

        let bytes_len_usize = usize::try_from(bytes_len).map_err(|_| ())?;
        let output_len = varint_len.checked_add(bytes_len_usize).ok_or(())?;

        if output_len <= src.len() {
            Ok(Self(&src[..output_len]))
        } else {
            Err(())
        }
    }

    /// Wraps an already-length-prefixed slice without re-validating it.
    #[inline]
    #[must_use]
    pub fn new_unchecked(prefixed_data: &'a [u8]) -> Self {
        Self(prefixed_data)
    }

    /// Get the full slice referenced by this `LengthPrefixedBytes` value, consisting of a
    /// `data_len` varint32 used as a length prefix followed by a `data` slice of length
    /// `data_len`.
    #[inline]
    #[must_use]
    pub fn prefixed_data(&self) -> &[u8] {
        self.0
    }

    /// Get only the `data` slice referenced by this `LengthPrefixedBytes` value, excluding
    /// the `data_len` length prefix.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        let prefix_len = u32::decode_var(self.0).unwrap().1;
        &self.0[prefix_len..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_type_round_trips() {
        for raw in 0u8..5 {
            let kind = EntryType::try_from(raw).unwrap();
            assert_eq!(u8::from(kind), raw);
        }
        assert!(EntryType::try_from(5).is_err());
    }

    #[test]
    fn tombstone_kinds() {
        assert!(EntryType::Deletion.is_tombstone());
        assert!(EntryType::SingleDeletion.is_tombstone());
        assert!(!EntryType::Value.is_tombstone());
        assert!(!EntryType::Merge.is_tombstone());
        assert!(!EntryType::RangeDeletion.is_tombstone());
    }
}
