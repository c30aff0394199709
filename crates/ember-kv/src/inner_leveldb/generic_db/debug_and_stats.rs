use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};

use generic_container::FragileContainer as _;

use crate::{
    error::Error,
    file_tracking::Level,
    format::{LookupKey, SequenceNumber, UserKey},
    leveldb_generics::LevelDBGenerics,
    table_file::get_table,
    table_traits::InternalComparator,
    version::Version,
};
use super::super::{db_data::ReadWriteStatus, write_impl::DBWriteImpl};
use super::InnerGenericDB;


#[expect(unreachable_pub, reason = "control visibility at type definition")]
impl<LDBG: LevelDBGenerics, WriteImpl: DBWriteImpl<LDBG>> InnerGenericDB<LDBG, WriteImpl> {
    /// If the database has observed a corruption error severe enough to prevent further reads or
    /// writes, return it.
    #[must_use]
    pub fn check_corruption(&self) -> Option<Error> {
        match &self.shared_mutable().read().readwrite_status {
            ReadWriteStatus::CorruptionError(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// The number of table files belonging to the given level (0-indexed) of the current version.
    ///
    /// Returns `None` if `level` is not a valid level index.
    #[must_use]
    pub fn num_files_at_level(&self, level: u8) -> Option<usize> {
        let level = Level::ALL_LEVELS.get(usize::from(level)).copied()?;
        let shared_mutable = self.shared_mutable().read();
        Some(shared_mutable.version_set.current().level_files(level).inner().len())
    }

    /// Approximate the combined size, in bytes, of the data belonging to each `[start, end]` user
    /// key range in `ranges`.
    ///
    /// The returned sizes are estimates: a file is counted in full if its key range falls
    /// entirely within `[start, end]`, and the position of `start`/`end` is estimated within a
    /// boundary file by consulting its index block (not scanned key-by-key).
    #[must_use]
    pub fn approximate_sizes(&self, ranges: &[(UserKey<'_>, UserKey<'_>)]) -> Vec<u64> {
        let shared_mutable = self.shared_mutable().read();
        let version = shared_mutable.version_set.current();
        let cmp = &self.shared().table_options.comparator;

        ranges.iter().map(|&(start, end)| {
            let start_offset = self.approximate_offset_of(cmp, version, start);
            let end_offset = self.approximate_offset_of(cmp, version, end);
            end_offset.saturating_sub(start_offset)
        }).collect()
    }

    /// Approximate the offset, within the whole database, of the first entry with a user key
    /// `>= key`. Files entirely below `key` contribute their full size; files entirely above it
    /// contribute nothing; a file straddling `key` contributes the offset `Table::get`'s index
    /// block reports for that key.
    fn approximate_offset_of(
        &self,
        cmp:     &InternalComparator<LDBG::Cmp>,
        version: &Version<LDBG::Refcounted>,
        key:     UserKey<'_>,
    ) -> u64 {
        let mut buffer = Vec::new();
        let lookup_key = LookupKey::new(&mut buffer, key, SequenceNumber::MAX_USABLE_SEQUENCE_NUMBER);
        let encoded_key = lookup_key.encoded_internal_key().0;

        let mut total = 0_u64;

        for level in Level::all_levels() {
            for file in version.level_files(level).inner() {
                if cmp.cmp_user(file.largest_user_key(), key) == Ordering::Less {
                    total += file.file_size();
                    continue;
                }

                if cmp.cmp_user(file.smallest_user_key(), key) != Ordering::Less {
                    // This file, and (for levels above 0) every later file at this level, starts
                    // at or after `key`; it contributes nothing.
                    if level != Level::ZERO {
                        break;
                    }
                    continue;
                }

                // `key` falls within this file's range: consult its index block for a precise
                // offset rather than counting the whole file.
                let table_container = get_table::<LDBG>(
                    self.shared_access().filesystem(),
                    self.shared_access().db_directory(),
                    self.shared_access().table_cache(),
                    self.shared_access().read_table_options(),
                    file.file_number(),
                    file.file_size(),
                );

                total += match table_container {
                    Ok(table_container) => table_container.get_ref().approximate_offset_of_key(encoded_key),
                    Err(()) => file.file_size(),
                };
            }
        }

        total
    }

    /// Write a one-line-per-file summary of the current version's table files, formatted with
    /// `display_key` used to render each file's smallest and largest user key.
    pub fn file_summary_with<D: Fn(&[u8]) -> String>(
        &self,
        f:           &mut Formatter<'_>,
        display_key: D,
    ) -> FmtResult {
        let shared_mutable = self.shared_mutable().read();
        let version = shared_mutable.version_set.current();

        for level in Level::all_levels() {
            for file in version.level_files(level).inner() {
                writeln!(
                    f,
                    "level {level}: file {file_number} ({file_size} bytes) [{smallest}, {largest}]",
                    level       = level.inner(),
                    file_number = file.file_number().0,
                    file_size   = file.file_size(),
                    smallest    = display_key(file.smallest_user_key().0),
                    largest     = display_key(file.largest_user_key().0),
                )?;
            }
        }

        Ok(())
    }

    /// Like [`Self::file_summary_with`], displaying keys as lossy UTF-8 text.
    pub fn file_summary_with_text_keys(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.file_summary_with(f, |key| String::from_utf8_lossy(key).into_owned())
    }

    /// Like [`Self::file_summary_with`], displaying keys as hexadecimal bytes.
    pub fn file_summary_with_numeric_keys(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.file_summary_with(f, |key| key.iter().map(|byte| format!("{byte:02x}")).collect())
    }

    /// Append `message` to the `LOG` info log file, at [`tracing::Level::INFO`].
    pub fn info_log(&self, message: impl Display) {
        let message = message.to_string();
        self.shared_mutable().write().info_logger.log_event(
            tracing::Level::INFO,
            || message,
        );
    }
}
