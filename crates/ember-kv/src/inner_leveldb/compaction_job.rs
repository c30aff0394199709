//! Manual range/full compaction (§4.9/§4.10): merge every file at or below the highest level that
//! overlaps the requested key range into one new run at that level, dropping entries no live
//! snapshot could still observe.
//!
//! Grounded on [`flush_job`](super::flush_job)'s apply -> log_to_manifest -> install commit
//! pattern and [`build_table`](crate::table_file::build_table)'s table-writing loop; unlike a
//! flush, a compaction job reads many input files and merge-sorts across them with
//! [`seekable_iterator::MergingIter`] rather than walking a single memtable, and may produce more
//! than one output file when the merged input exceeds [`InnerDBOptions::file_size_limit`].
//!
//! `Version::levels_for_range_compaction` always returns a range starting at level 0, so every
//! input file for a given user key in the range is included in one job; there is never a copy of
//! that key left at a level below the output, which makes every compaction run here a "bottommost"
//! compaction for the keys it touches, and reclaiming an old tombstone is always sound once it is
//! no longer needed by any live snapshot.
//!
//! [`InnerDBOptions::file_size_limit`]: super::db_data::InnerDBOptions

use clone_behavior::MirroredClone as _;
use generic_container::Container as _;
use seekable_iterator::{CursorLendingIterator as _, MergingIter, Seekable as _};

use ember_sstable::adapters::ComparatorAdapter;
use ember_vfs::traits::WritableFilesystem as _;

use crate::{
    containers::FragileRwCell as _,
    database_files::LevelDBFileName,
    file_tracking::{FileMetadata, Level, SeeksBetweenCompactionOptions},
    format::{FileNumber, InternalKey, SequenceNumber, UserKey},
    public_format::EntryType,
    table_file::{get_table, InternalTableIter},
    table_traits::adapters::InternalComparator,
    version::{VersionEdit, VersionSet},
};
use crate::leveldb_generics::{
    FastClone as _, LdbFullShared, LdbTableBuilder, LevelDBGenerics,
};
use super::write_impl::DBWriteImpl;
use crate::leveldb_iter::InternalIter;


/// Manually compact the key range `[lower_bound, upper_bound]` (unbounded on either side if
/// `None`), blocking until the affected levels have been merged into one new run.
///
/// Does nothing (and commits no version edit) if no file currently overlaps the range.
///
/// # Errors
/// Returns `Err(())` on any I/O failure opening an input file, writing an output file, or
/// committing the resulting version edit. Per [`VersionSet::apply`], a failure while committing
/// is fatal for further writes.
pub(crate) fn compact_levels<LDBG, WriteImpl>(
    shared:      LdbFullShared<'_, LDBG, WriteImpl>,
    lower_bound: Option<UserKey<'_>>,
    upper_bound: Option<UserKey<'_>>,
) -> Result<(), ()>
where
    LDBG:      LevelDBGenerics,
    WriteImpl: DBWriteImpl<LDBG>,
{
    let (db_shared, db_shared_mutable) = shared;
    let mut db_mutable = db_shared_mutable.write();

    let cmp = db_shared.table_options.comparator.fast_mirrored_clone();
    let levels: Vec<Level> = db_mutable.version_set.current()
        .levels_for_range_compaction(&cmp, lower_bound, upper_bound)
        .collect();

    #[expect(clippy::expect_used, reason = "`inclusive_range` never returns an empty iterator")]
    let highest_level = *levels.last().expect("levels_for_range_compaction returns at least one level");

    let mut inputs: Vec<(Level, FileNumber, u64)> = Vec::new();
    for level in levels.iter().copied() {
        for file in db_mutable.version_set.current().level_files(level).inner() {
            inputs.push((level, file.file_number(), file.file_size()));
        }
    }

    if inputs.is_empty() {
        return Ok(());
    }

    let output_level = if highest_level == Level::ZERO {
        highest_level.next_level().unwrap_or(Level::ZERO)
    } else {
        highest_level
    };

    let smallest_snapshot = db_mutable.snapshot_list.read()
        .oldest_sequence_number()
        .unwrap_or_else(|| db_mutable.version_set.last_sequence());

    let mut table_iters = Vec::with_capacity(inputs.len());
    for &(_level, file_number, file_size) in &inputs {
        let table = get_table::<LDBG>(
            &db_shared.filesystem.filesystem,
            &db_shared.db_directory,
            &db_shared.table_cache,
            db_shared.table_options.fast_clone(),
            file_number,
            file_size,
        )?;
        table_iters.push(InternalIter::Table(InternalTableIter::<LDBG>::new(table)));
    }

    let mut merged = MergingIter::<
        [u8],
        ComparatorAdapter<InternalComparator<LDBG::Cmp>>,
        InternalIter<LDBG, WriteImpl>,
    >::new(table_iters, ComparatorAdapter(cmp.mirrored_clone()));
    merged.seek_to_first();

    let mut output_files: Vec<FileMetadata> = Vec::new();
    let mut builder: Option<(LdbTableBuilder<LDBG>, FileNumber, Vec<u8>, Vec<u8>, bool)> = None;

    let mut current_user_key: Vec<u8> = Vec::new();
    let mut have_current_user_key = false;
    let mut last_kept_sequence = SequenceNumber::MAX_SEQUENCE_NUMBER;

    while let Some(entry) = merged.current() {
        let decoded = InternalKey::decode(entry.encoded_internal_key())?;

        let same_user_key = have_current_user_key
            && cmp.cmp_user(UserKey(&current_user_key), decoded.user_key).is_eq();
        if !same_user_key {
            current_user_key.clear();
            current_user_key.extend_from_slice(decoded.user_key.0);
            have_current_user_key = true;
            last_kept_sequence = SequenceNumber::MAX_SEQUENCE_NUMBER;
        }

        let shadowed = last_kept_sequence <= smallest_snapshot;
        let droppable_tombstone =
            !shadowed
            && matches!(decoded.entry_type, EntryType::Deletion | EntryType::SingleDeletion)
            && decoded.sequence_number <= smallest_snapshot;

        if !shadowed {
            last_kept_sequence = decoded.sequence_number;
        }

        if !shadowed && !droppable_tombstone {
            if builder.is_none() {
                let file_number = db_mutable.version_set.new_file_number().map_err(|_| ())?;
                let path = LevelDBFileName::Table { file_number }.file_path(&db_shared.db_directory);
                let file = {
                    let mut fs = db_shared.filesystem.filesystem.write();
                    fs.open_writable(&path, true).map_err(|_| ())?
                };
                let write_options: crate::leveldb_generics::LdbTableOptions<LDBG> =
                    FastClone::fast_clone(&db_shared.table_options);
                let mut new_builder = LdbTableBuilder::<LDBG>::new(write_options.into());
                new_builder.start(file);
                builder = Some((new_builder, file_number, Vec::new(), Vec::new(), false));
            }

            #[expect(clippy::unwrap_used, reason = "just ensured `builder.is_some()` above")]
            let (table_builder, _file_number, smallest_buf, largest_buf, seen_any) = builder.as_mut().unwrap();

            let encoded_key = entry.encoded_internal_key().0;
            if !*seen_any {
                smallest_buf.clear();
                smallest_buf.extend_from_slice(encoded_key);
                *seen_any = true;
            }
            largest_buf.clear();
            largest_buf.extend_from_slice(encoded_key);

            table_builder.add_entry(encoded_key, entry.value_bytes())?;

            if table_builder.estimated_finished_file_length() >= db_shared.db_options.file_size_limit {
                finish_output_file(
                    &mut builder, &mut output_files, db_shared.db_options.seek_options,
                )?;
            }
        }

        if merged.next().is_none() {
            break;
        }
    }

    finish_output_file(&mut builder, &mut output_files, db_shared.db_options.seek_options)?;

    let mut edit = VersionEdit::new_empty();
    for (level, file_number, _size) in inputs {
        edit.deleted_files.push((level, file_number));
    }
    for metadata in output_files {
        edit.added_files.push((output_level, LDBG::Refcounted::Container::new_container(metadata)));
    }

    let log_token = db_mutable.version_set.apply(
        &db_shared.table_options.comparator,
        &mut edit,
        db_shared.db_options.verify_new_versions,
    )?;
    let install_token = VersionSet::log_to_manifest(log_token).map_err(|_| ())?;
    db_mutable.version_set.install(install_token);

    Ok(())
}

type PendingOutputFile<LDBG> = (LdbTableBuilder<LDBG>, FileNumber, Vec<u8>, Vec<u8>, bool);

fn finish_output_file<LDBG: LevelDBGenerics>(
    builder:      &mut Option<PendingOutputFile<LDBG>>,
    output_files: &mut Vec<FileMetadata>,
    seek_options: SeeksBetweenCompactionOptions,
) -> Result<(), ()> {
    let Some((mut table_builder, file_number, smallest_buf, largest_buf, seen_any)) = builder.take() else {
        return Ok(());
    };
    if !seen_any {
        return Ok(());
    }

    let file_size = table_builder.finish(true)?;

    #[expect(clippy::expect_used, reason = "`seen_any` guarantees at least one entry was added")]
    let smallest_key = InternalKey::decode(crate::format::EncodedInternalKey(&smallest_buf))
        .expect("re-decoding a previously-decoded internal key must succeed");
    #[expect(clippy::expect_used, reason = "`seen_any` guarantees at least one entry was added")]
    let largest_key = InternalKey::decode(crate::format::EncodedInternalKey(&largest_buf))
        .expect("re-decoding a previously-decoded internal key must succeed");

    output_files.push(FileMetadata::new(file_number, file_size, smallest_key, largest_key, seek_options));
    Ok(())
}
