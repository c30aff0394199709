//! Consistent hard-linked directory snapshots (§4.12).
//!
//! Deliberately bypasses the [`crate::leveldb_generics::LevelDBGenerics`] filesystem abstraction:
//! hard-linking is an operating-system-filesystem concept with no sensible meaning for the
//! in-memory backend, so a checkpoint is only ever taken of a real on-disk database directory.
//! Callers pass in the already-decided set of files to preserve (live SSTs, log files under the
//! size cutoff) rather than this module reaching into `VersionSet` itself, keeping it testable
//! against a plain temp directory.

use std::fs;
use std::io;
use std::path::Path;

use crate::database_files::LevelDBFileName;
use crate::format::FileNumber;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CheckpointError {
    #[error("checkpoint destination already exists: {0}")]
    DestinationExists(std::path::PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A log file eligible for copying into the checkpoint, alongside its current size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CheckpointLogFile {
    pub file_number: FileNumber,
    pub size:        u64,
}

/// Inputs describing the state to preserve, gathered by the caller while holding a read lock on
/// the current `Version` (so the set of live files cannot change mid-checkpoint).
#[derive(Debug, Clone)]
pub(crate) struct CheckpointPlan {
    pub live_table_files:     Vec<FileNumber>,
    pub manifest_file_number: FileNumber,
    /// Log files to copy verbatim, already filtered to `size <= log_size_for_flush`.
    pub log_files:            Vec<CheckpointLogFile>,
}

/// Create a checkpoint of `src_dir` at `dest_dir` per the plan computed by the caller.
///
/// Steps 1 (issue a flush when `log_size_for_flush == 0`) and 2 (acquire the Version read lock)
/// are the caller's responsibility, since both require access to the live, generic DB core; this
/// function implements steps 3-9 of the checkpoint algorithm.
pub(crate) fn create(src_dir: &Path, dest_dir: &Path, plan: &CheckpointPlan) -> Result<(), CheckpointError> {
    if dest_dir.exists() {
        return Err(CheckpointError::DestinationExists(dest_dir.to_owned()));
    }

    if let Err(err) = try_create(src_dir, dest_dir, plan) {
        let _ = fs::remove_dir_all(dest_dir);
        return Err(err);
    }

    Ok(())
}

fn try_create(src_dir: &Path, dest_dir: &Path, plan: &CheckpointPlan) -> Result<(), CheckpointError> {
    fs::create_dir_all(dest_dir)?;

    for &file_number in &plan.live_table_files {
        link_or_copy_table(src_dir, dest_dir, file_number)?;
    }

    let manifest_name = LevelDBFileName::Manifest { file_number: plan.manifest_file_number }.file_name();
    fs::copy(src_dir.join(&manifest_name), dest_dir.join(&manifest_name))?;

    let current_name = LevelDBFileName::Current.file_name();
    fs::copy(src_dir.join(&current_name), dest_dir.join(&current_name))?;

    for log in &plan.log_files {
        let log_name = LevelDBFileName::Log { file_number: log.file_number }.file_name();
        fs::copy(src_dir.join(&log_name), dest_dir.join(&log_name))?;
    }

    // OPTIONS is best-effort: older databases, or ones opened without ever persisting an
    // OPTIONS file, simply won't have one.
    let options_name = src_dir.join("OPTIONS");
    if options_name.exists() {
        let _ = fs::copy(&options_name, dest_dir.join("OPTIONS"));
    }

    Ok(())
}

fn link_or_copy_table(src_dir: &Path, dest_dir: &Path, file_number: FileNumber) -> Result<(), CheckpointError> {
    let src_name = LevelDBFileName::Table { file_number }.file_name();
    let src_path = src_dir.join(&src_name);

    let (src_path, dest_name) = if src_path.exists() {
        (src_path, src_name)
    } else {
        // Fall back to the legacy extension, matching the same lookup order used on the read
        // path (see `table_file::read_table::get_table`).
        let legacy_name = LevelDBFileName::TableLegacyExtension { file_number }.file_name();
        (src_dir.join(&legacy_name), legacy_name)
    };
    let dest_path = dest_dir.join(&dest_name);

    match fs::hard_link(&src_path, &dest_path) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(&src_path, &dest_path)?;
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &Path, contents: &[u8]) {
        fs::write(path, contents).expect("test setup write should succeed");
    }

    #[test]
    fn checkpoint_links_tables_and_copies_manifest_and_current() {
        let tmp = tempfile_dir();
        let src = tmp.join("src");
        let dest = tmp.join("dest");
        fs::create_dir_all(&src).unwrap();

        write_file(&src.join("000001.ldb"), b"table-one");
        write_file(&src.join("MANIFEST-000002"), b"manifest");
        write_file(&src.join("CURRENT"), b"MANIFEST-000002\n");
        write_file(&src.join("000003.log"), b"log-bytes");

        let plan = CheckpointPlan {
            live_table_files:     vec![FileNumber(1)],
            manifest_file_number: FileNumber(2),
            log_files:            vec![CheckpointLogFile { file_number: FileNumber(3), size: 9 }],
        };

        create(&src, &dest, &plan).expect("checkpoint should succeed");

        assert_eq!(fs::read(dest.join("000001.ldb")).unwrap(), b"table-one");
        assert_eq!(fs::read(dest.join("MANIFEST-000002")).unwrap(), b"manifest");
        assert_eq!(fs::read(dest.join("CURRENT")).unwrap(), b"MANIFEST-000002\n");
        assert_eq!(fs::read(dest.join("000003.log")).unwrap(), b"log-bytes");

        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn checkpoint_rejects_an_existing_destination() {
        let tmp = tempfile_dir();
        let src = tmp.join("src2");
        let dest = tmp.join("dest2");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dest).unwrap();

        write_file(&src.join("MANIFEST-000001"), b"m");
        write_file(&src.join("CURRENT"), b"MANIFEST-000001\n");

        let plan = CheckpointPlan {
            live_table_files:     vec![],
            manifest_file_number: FileNumber(1),
            log_files:            vec![],
        };

        let err = create(&src, &dest, &plan).expect_err("destination already exists");
        assert!(matches!(err, CheckpointError::DestinationExists(_)));

        fs::remove_dir_all(&tmp).ok();
    }

    /// A directory under the crate's build output, unique per test via the process id and an
    /// incrementing counter, avoiding a `tempfile` dependency the rest of the crate doesn't use.
    fn tempfile_dir() -> std::path::PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir()
            .join(format!("ember-kv-checkpoint-test-{}-{n}", std::process::id()));
        fs::create_dir_all(&dir).expect("creating the test tmp root should succeed");
        dir
    }
}
