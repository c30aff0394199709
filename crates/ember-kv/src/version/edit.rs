//! The delta record applied to a [`super::Version`] and appended to the MANIFEST: everything
//! that changed since the last edit (new files, deleted files, compaction pointers, and any of
//! the few [`super::VersionSet`] scalars that moved).

use std::fmt::{Debug, Formatter, Result as FmtResult};

use integer_encoding::{VarInt as _, VarIntWriter as _};

use crate::containers::RefcountedFamily;
use crate::compaction::CompactionPointer;
use crate::file_tracking::{
    FileMetadata, Level, RefcountedFileMetadata, SeeksBetweenCompactionOptions,
};
use crate::format::{EncodedInternalKey, FileNumber, InternalKey, SequenceNumber};


/// Tag bytes prefixing each field recorded in an encoded [`VersionEdit`].
///
/// Matches the original LevelDB `VersionEditTag` numbering, so that a MANIFEST written by this
/// crate can, in principle, be read back by anything that shares the same tag assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum EditTag {
    Comparator      = 1,
    LogNumber       = 2,
    NextFileNumber  = 3,
    LastSequence    = 4,
    CompactPointer  = 5,
    DeletedFile     = 6,
    NewFile         = 7,
    // 8 is unused, matching the gap in the original tag numbering.
    PrevLogNumber   = 9,
}

impl TryFrom<u8> for EditTag {
    type Error = ();

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::Comparator),
            2 => Ok(Self::LogNumber),
            3 => Ok(Self::NextFileNumber),
            4 => Ok(Self::LastSequence),
            5 => Ok(Self::CompactPointer),
            6 => Ok(Self::DeletedFile),
            7 => Ok(Self::NewFile),
            9 => Ok(Self::PrevLogNumber),
            _ => Err(()),
        }
    }
}

/// A set of changes to apply to a [`super::Version`], produced either by a foreground write
/// (recording a new log/file-number watermark) or by a background job (recording the files a
/// flush or compaction added and removed).
///
/// Every field is either "unset" (nothing recorded, leave the corresponding [`super::VersionSet`]
/// scalar or [`super::VersionBuilder`] bookkeeping untouched) or carries the single new value to
/// apply; the list fields ([`Self::compaction_pointers`], [`Self::deleted_files`],
/// [`Self::added_files`]) can carry any number of entries, one per level touched.
pub(crate) struct VersionEdit<Refcounted: RefcountedFamily> {
    pub comparator_name:    Option<Vec<u8>>,
    pub log_number:         Option<FileNumber>,
    pub prev_log_number:    Option<FileNumber>,
    pub next_file_number:   Option<FileNumber>,
    pub last_sequence:      Option<SequenceNumber>,
    pub compaction_pointers: Vec<(Level, CompactionPointer)>,
    pub deleted_files:      Vec<(Level, FileNumber)>,
    pub added_files:        Vec<(Level, RefcountedFileMetadata<Refcounted>)>,
}

#[expect(unreachable_pub, reason = "control visibility at type definition")]
impl<Refcounted: RefcountedFamily> VersionEdit<Refcounted> {
    #[must_use]
    pub fn new_empty() -> Self {
        Self {
            comparator_name:     None,
            log_number:          None,
            prev_log_number:     None,
            next_file_number:    None,
            last_sequence:       None,
            compaction_pointers: Vec::new(),
            deleted_files:       Vec::new(),
            added_files:         Vec::new(),
        }
    }

    /// Appends this edit's encoding to `buffer`. `buffer` need not be empty; bytes are only ever
    /// appended, never overwritten.
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        if let Some(comparator_name) = &self.comparator_name {
            buffer.push(EditTag::Comparator as u8);
            write_prefixed(buffer, comparator_name);
        }
        if let Some(log_number) = self.log_number {
            buffer.push(EditTag::LogNumber as u8);
            buffer.write_varint(log_number.0).unwrap();
        }
        if let Some(prev_log_number) = self.prev_log_number {
            buffer.push(EditTag::PrevLogNumber as u8);
            buffer.write_varint(prev_log_number.0).unwrap();
        }
        if let Some(next_file_number) = self.next_file_number {
            buffer.push(EditTag::NextFileNumber as u8);
            buffer.write_varint(next_file_number.0).unwrap();
        }
        if let Some(last_sequence) = self.last_sequence {
            buffer.push(EditTag::LastSequence as u8);
            buffer.write_varint(last_sequence.inner()).unwrap();
        }

        for (level, pointer) in &self.compaction_pointers {
            buffer.push(EditTag::CompactPointer as u8);
            buffer.write_varint(u32::from(level.inner())).unwrap();
            write_internal_key(buffer, pointer.internal_key());
        }

        for (level, file_number) in &self.deleted_files {
            buffer.push(EditTag::DeletedFile as u8);
            buffer.write_varint(u32::from(level.inner())).unwrap();
            buffer.write_varint(file_number.0).unwrap();
        }

        for (level, file) in &self.added_files {
            buffer.push(EditTag::NewFile as u8);
            buffer.write_varint(u32::from(level.inner())).unwrap();
            buffer.write_varint(file.file_number().0).unwrap();
            buffer.write_varint(file.file_size()).unwrap();
            write_internal_key(buffer, file.smallest_key());
            write_internal_key(buffer, file.largest_key());
        }
    }

    /// Decodes a `VersionEdit` from a single MANIFEST (or, in principle, any framed-record
    /// source) record. `seek_opts` is used to initialize the seek-compaction counters of any
    /// [`FileMetadata`] reconstructed from a [`EditTag::NewFile`] entry; it is not itself part of
    /// the persisted edit.
    pub fn decode_from(record: &[u8], seek_opts: SeeksBetweenCompactionOptions) -> Result<Self, ()> {
        let mut edit = Self::new_empty();
        let mut remaining = record;

        while let Some((&tag_byte, after_tag)) = remaining.split_first() {
            let tag = EditTag::try_from(tag_byte)?;
            remaining = after_tag;

            match tag {
                EditTag::Comparator => {
                    let (name, rest) = read_prefixed(remaining)?;
                    edit.comparator_name = Some(name.to_vec());
                    remaining = rest;
                }
                EditTag::LogNumber => {
                    let (value, rest) = read_varint_u64(remaining)?;
                    edit.log_number = Some(FileNumber(value));
                    remaining = rest;
                }
                EditTag::PrevLogNumber => {
                    let (value, rest) = read_varint_u64(remaining)?;
                    edit.prev_log_number = Some(FileNumber(value));
                    remaining = rest;
                }
                EditTag::NextFileNumber => {
                    let (value, rest) = read_varint_u64(remaining)?;
                    edit.next_file_number = Some(FileNumber(value));
                    remaining = rest;
                }
                EditTag::LastSequence => {
                    let (value, rest) = read_varint_u64(remaining)?;
                    edit.last_sequence = Some(SequenceNumber::new_unchecked(value));
                    remaining = rest;
                }
                EditTag::CompactPointer => {
                    let (level, rest) = read_level(remaining)?;
                    let (key, rest) = read_internal_key(rest)?;
                    edit.compaction_pointers.push((level, CompactionPointer::new(key)));
                    remaining = rest;
                }
                EditTag::DeletedFile => {
                    let (level, rest) = read_level(remaining)?;
                    let (file_number, rest) = read_varint_u64(rest)?;
                    edit.deleted_files.push((level, FileNumber(file_number)));
                    remaining = rest;
                }
                EditTag::NewFile => {
                    let (level, rest) = read_level(remaining)?;
                    let (file_number, rest) = read_varint_u64(rest)?;
                    let (file_size, rest) = read_varint_u64(rest)?;
                    let (smallest_key, rest) = read_internal_key(rest)?;
                    let (largest_key, rest) = read_internal_key(rest)?;

                    let metadata = FileMetadata::new(
                        FileNumber(file_number),
                        file_size,
                        smallest_key,
                        largest_key,
                        seek_opts,
                    );
                    edit.added_files.push((
                        level,
                        Refcounted::Container::new_container(metadata),
                    ));
                    remaining = rest;
                }
            }
        }

        Ok(edit)
    }
}

impl<Refcounted: RefcountedFamily> Debug for VersionEdit<Refcounted> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let added_files = DebugAddedFiles::<Refcounted>::new(&self.added_files);

        f.debug_struct("VersionEdit")
            .field("comparator_name",     &self.comparator_name)
            .field("log_number",          &self.log_number)
            .field("prev_log_number",     &self.prev_log_number)
            .field("next_file_number",    &self.next_file_number)
            .field("last_sequence",       &self.last_sequence)
            .field("compaction_pointers", &self.compaction_pointers)
            .field("deleted_files",       &self.deleted_files)
            .field("added_files",         &added_files)
            .finish()
    }
}

fn write_prefixed(buffer: &mut Vec<u8>, data: &[u8]) {
    buffer.write_varint(u32::try_from(data.len()).expect("comparator name too long")).unwrap();
    buffer.extend_from_slice(data);
}

fn write_internal_key(buffer: &mut Vec<u8>, key: InternalKey<'_>) {
    buffer.write_varint(key.encoded_len_u32()).unwrap();
    key.append_encoded(buffer);
}

fn read_prefixed(remaining: &[u8]) -> Result<(&[u8], &[u8]), ()> {
    let (len, varint_len) = u32::decode_var(remaining).ok_or(())?;
    let len = usize::try_from(len).map_err(|_| ())?;
    let start = varint_len;
    let end = start.checked_add(len).ok_or(())?;
    let data = remaining.get(start..end).ok_or(())?;
    Ok((data, remaining.get(end..).ok_or(())?))
}

fn read_internal_key(remaining: &[u8]) -> Result<(InternalKey<'_>, &[u8]), ()> {
    let (encoded, rest) = read_prefixed(remaining)?;
    let key = InternalKey::decode(EncodedInternalKey(encoded))?;
    Ok((key, rest))
}

fn read_varint_u64(remaining: &[u8]) -> Result<(u64, &[u8]), ()> {
    let (value, varint_len) = u64::decode_var(remaining).ok_or(())?;
    Ok((value, remaining.get(varint_len..).ok_or(())?))
}

fn read_level(remaining: &[u8]) -> Result<(Level, &[u8]), ()> {
    let (value, rest) = read_varint_u64(remaining)?;
    let level = Level::try_from(u32::try_from(value).map_err(|_| ())?)?;
    Ok((level, rest))
}

/// A `Debug` adapter for `added_files`, printing file numbers and levels without requiring
/// `Refcounted::Container<FileMetadata>` to implement `Debug` through a deref-and-inspect path
/// that would otherwise force every caller of `VersionEdit`'s `Debug` impl to also thread
/// `Refcounted::ContainerAsDebug` bounds through.
pub(crate) struct DebugAddedFiles<'a, Refcounted: RefcountedFamily> {
    added_files: &'a [(Level, RefcountedFileMetadata<Refcounted>)],
}

impl<'a, Refcounted: RefcountedFamily> DebugAddedFiles<'a, Refcounted> {
    #[must_use]
    pub fn new(added_files: &'a [(Level, RefcountedFileMetadata<Refcounted>)]) -> Self {
        Self { added_files }
    }
}

impl<Refcounted: RefcountedFamily> Debug for DebugAddedFiles<'_, Refcounted> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_list()
            .entries(self.added_files.iter().map(|(level, file)| {
                (*level, file.file_number(), file.file_size())
            }))
            .finish()
    }
}
