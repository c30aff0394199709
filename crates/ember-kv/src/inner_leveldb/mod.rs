mod db_data;
mod db_shared_access;
mod fs_guard;
mod write_impl;

mod generic_db;

mod builder;

mod compaction_job;
mod flush_job;
mod live_write_impl;


pub(crate) use self::{
    builder::InitOptions,
    db_shared_access::DBSharedAccess,
    fs_guard::FSGuard,
    generic_db::{InnerGenericDB, ReadOptions, WriteOptions},
    live_write_impl::LiveWriteImpl,
    write_impl::DBWriteImpl,
};
pub(crate) use self::db_data::{DBShared, DBSharedMutable, InnerDBOptions, ReadWriteStatus};
