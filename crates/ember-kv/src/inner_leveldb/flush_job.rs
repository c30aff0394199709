//! Flushing the active memtable to a new level-0 table file (§4.8).
//!
//! Grounded on [`InnerGenericDBBuilder::flush_memtable`](super::builder), which builds a table
//! file from a recovered memtable during startup; this version additionally rotates in a fresh
//! memtable and log file and commits the change to the live [`VersionSet`] via
//! apply -> log_to_manifest -> install, rather than accumulating edits into a
//! [`VersionSetBuilder`](crate::version::VersionSetBuilder) for a single startup-time commit.

use std::mem;

use clone_behavior::MirroredClone as _;
use generic_container::Container as _;

use ember_vfs::traits::WritableFilesystem as _;

use crate::{
    containers::FragileRwCell as _,
    database_files::LevelDBFileName,
    file_tracking::Level,
    memtable::Memtable,
    table_file::build_table,
    version::{VersionEdit, VersionSet},
    write_log::WriteLogWriter,
};
use crate::leveldb_generics::{FastClone as _, LdbFullShared, LevelDBGenerics};

use super::write_impl::DBWriteImpl;


/// Flush the current memtable to a new level-0 table file and rotate in a fresh memtable and
/// write-ahead log, committing the version edit to the live [`VersionSet`](crate::version::VersionSet).
///
/// Returns the number of bytes the flushed memtable had reserved against the write buffer
/// (`0` if the memtable was empty, in which case no file or version edit is produced).
///
/// # Errors
/// Returns `Err(())` if a file number, the new log file, the table file, or the manifest commit
/// could not be obtained/written. Per [`VersionSet::apply`](crate::version::VersionSet::apply),
/// a failure during the log step is fatal for further writes.
pub(crate) fn flush_current_memtable<LDBG, WriteImpl>(
    shared: LdbFullShared<'_, LDBG, WriteImpl>,
) -> Result<u64, ()>
where
    LDBG:      LevelDBGenerics,
    WriteImpl: DBWriteImpl<LDBG>,
{
    let (db_shared, db_shared_mutable) = shared;
    let mut db_mutable = db_shared_mutable.write();

    if db_mutable.current_memtable.allocated_bytes() == 0 {
        return Ok(0);
    }

    let new_log_number = db_mutable.version_set.new_file_number().map_err(|_| ())?;
    let table_file_number = db_mutable.version_set.new_file_number().map_err(|_| ())?;
    let old_log_number = db_mutable.version_set.log_number();

    let new_log_path = LevelDBFileName::Log { file_number: new_log_number }
        .file_path(&db_shared.db_directory);
    let new_log_file = {
        let mut fs = db_shared.filesystem.filesystem.write();
        fs.open_writable(&new_log_path, false).map_err(|_| ())?
    };

    let fresh_cmp = db_shared.table_options.comparator.0.fast_mirrored_clone();
    let flushed_memtable = mem::replace(
        &mut db_mutable.current_memtable,
        Memtable::new(fresh_cmp),
    );
    let flushed_bytes = flushed_memtable.allocated_bytes();
    db_mutable.current_log = WriteLogWriter::new_empty(new_log_file);

    let table_metadata = build_table::<LDBG>(
        &db_shared.filesystem.filesystem,
        &db_shared.db_directory,
        &db_shared.table_cache,
        db_shared.table_options.fast_clone(),
        db_shared.db_options.seek_options,
        &flushed_memtable,
        table_file_number,
    )?;

    let mut edit = VersionEdit::new_empty();
    edit.log_number = Some(new_log_number);
    edit.prev_log_number = Some(old_log_number);
    if let Some(table_metadata) = table_metadata {
        edit.added_files.push((Level::ZERO, LDBG::Refcounted::Container::new_container(table_metadata)));
    }

    let log_token = db_mutable.version_set.apply(
        &db_shared.table_options.comparator,
        &mut edit,
        db_shared.db_options.verify_new_versions,
    )?;
    let install_token = VersionSet::log_to_manifest(log_token).map_err(|_| ())?;
    db_mutable.version_set.install(install_token);

    Ok(flushed_bytes)
}
