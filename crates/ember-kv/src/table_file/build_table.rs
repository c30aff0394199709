use std::path::Path;

use clone_behavior::MirroredClone as _;
use seekable_iterator::{CursorIterator as _, Seekable as _};

use crate::{
    containers::RwCellFamily as _,
    database_files::LevelDBFileName,
    file_tracking::{FileMetadata, SeeksBetweenCompactionOptions},
    format::{FileNumber, InternalKey},
    memtable::Memtable,
};
use crate::leveldb_generics::{LdbFsCell, LdbTableOptions, LevelDBGenerics};
use super::read_table::get_table;


/// Build a new table file on disk from the contents of `memtable`, in increasing internal-key
/// order.
///
/// Returns `Ok(None)` without creating a file if the memtable is empty; otherwise returns the
/// [`FileMetadata`] of the newly-built table. The table is opportunistically inserted into
/// `table_cache` so that a point lookup immediately following a flush does not have to reopen
/// the file it was just written to; a cache-population failure is not itself a build failure.
pub(crate) fn build_table<LDBG: LevelDBGenerics>(
    filesystem:        &LdbFsCell<LDBG>,
    db_directory:      &Path,
    table_cache:       &LDBG::TableCache,
    table_options:     LdbTableOptions<LDBG>,
    seek_options:      SeeksBetweenCompactionOptions,
    memtable:          &Memtable<LDBG::Cmp, LDBG::Skiplist>,
    table_file_number: FileNumber,
) -> Result<Option<FileMetadata>, ()> {
    let mut iter = memtable.iter();
    iter.seek_to_first();

    if !iter.valid() {
        return Ok(None);
    }

    let table_path = LevelDBFileName::Table { file_number: table_file_number }
        .file_path(db_directory);

    let table_file = {
        let mut fs = filesystem.write();
        fs.open_writable(&table_path, true).map_err(|_| ())?
    };

    let read_opts = table_options.fast_clone();
    let write_opts = table_options.into();

    let mut builder = crate::leveldb_generics::LdbTableBuilder::<LDBG>::new(write_opts);
    builder.start(table_file);

    let mut smallest_key_buf: Vec<u8> = Vec::new();
    let mut largest_key_buf:  Vec<u8> = Vec::new();
    let mut seen_any = false;

    while iter.valid() {
        #[expect(clippy::expect_used, reason = "`iter.valid()` was just checked")]
        let entry = iter.current().expect("memtable iterator reported valid but yielded None");
        let (encoded_key, value) = entry.key_and_value();

        if !seen_any {
            smallest_key_buf.clear();
            smallest_key_buf.extend_from_slice(encoded_key.0);
            seen_any = true;
        }
        largest_key_buf.clear();
        largest_key_buf.extend_from_slice(encoded_key.0);

        builder.add_entry(encoded_key.0, value.data())?;

        iter.next();
    }

    let file_size = builder.finish(true)?;

    #[expect(clippy::expect_used, reason = "the loop above ran at least once, as `iter` was valid")]
    let smallest_key = InternalKey::decode(crate::format::EncodedInternalKey(&smallest_key_buf))
        .expect("re-decoding a previously-decoded internal key must succeed");
    #[expect(clippy::expect_used, reason = "the loop above ran at least once, as `iter` was valid")]
    let largest_key = InternalKey::decode(crate::format::EncodedInternalKey(&largest_key_buf))
        .expect("re-decoding a previously-decoded internal key must succeed");

    let metadata = FileMetadata::new(
        table_file_number,
        file_size,
        smallest_key,
        largest_key,
        seek_options,
    );

    // Best-effort: warm the table cache with the file we just wrote. A failure here does not
    // invalidate the table, which is already durably on disk.
    let _ = get_table::<LDBG>(
        filesystem,
        db_directory,
        table_cache,
        read_opts,
        table_file_number,
        file_size,
    );

    Ok(Some(metadata))
}
