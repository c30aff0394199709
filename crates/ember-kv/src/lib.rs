// Import paths are not currently stable.
#![allow(
    warnings,
    reason = "this crate is very unstable. Allow checks to be done on full repo without noise.",
)]


pub mod containers;
// pub mod external_sync;

pub mod background_worker;
pub mod checkpoint;
pub mod config_constants;
pub mod database_files;
pub mod error;
pub mod format; // TODO: make this private
pub mod public_format;
pub mod table_traits;

pub mod compaction;
pub mod file_tracking;
pub mod leveldb_generics;
pub mod leveldb_iter;
pub mod lock_manager;
pub mod memtable;
pub mod read_sampling;
pub mod snapshot;
pub mod table_file;
// pub mod time_env;
pub mod transaction;
pub mod version;
pub mod write_batch;
pub mod write_buffer;
pub mod write_controller;
pub mod write_log;

pub mod info_logger;
pub mod corruption_handler;

pub mod inner_leveldb;

pub mod database;

#[cfg(test)]
#[cfg(any(unix, windows))]
#[cfg(feature = "moka-caches")]
pub mod read_test;
