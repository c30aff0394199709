//! The production [`DBWriteImpl`]: commits writes to the write-ahead log and active memtable,
//! flushes synchronously on the calling thread when the memtable or write buffer crosses its
//! threshold, and gates writers through a [`WriteController`] (§4.4/§4.6).
//!
//! Background, asynchronous flush/compaction scheduling via [`crate::background_worker`] is not
//! wired up yet; every flush this implementor triggers runs inline on the write that provoked it.
//! `compact_range`/`compact_full` likewise run their [`compaction_job`](super::compaction_job)
//! synchronously on the calling thread rather than handing it to a background worker.

use std::collections::HashSet;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::{
    containers::FragileRwCell as _,
    file_tracking::Level,
    format::{FileNumber, UserKey},
    write_batch::WriteBatch,
    write_buffer::WriteBuffer,
    write_controller::{WriteController, WriteControllerInputs},
};
use crate::leveldb_generics::{LdbFullShared, LdbLockedFullShared, LevelDBGenerics};

use super::{
    compaction_job::compact_levels, db_data::ReadWriteStatus, flush_job::flush_current_memtable,
    write_impl::DBWriteImpl,
};


/// Configuration for [`LiveWriteImpl`]; consumed by [`DBWriteImpl::split`] to build the
/// controller and buffer a database runs with for its whole lifetime.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LiveWriteImpl {
    pub write_buffer_size: u64,
}

pub(crate) struct LiveWriteShared {
    write_controller: WriteController,
    write_buffer:     WriteBuffer,
}

impl Debug for LiveWriteShared {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LiveWriteShared")
            .field("write_controller", &"<WriteController>")
            .field("write_buffer",     &"<WriteBuffer>")
            .finish()
    }
}

impl<LDBG: LevelDBGenerics> DBWriteImpl<LDBG> for LiveWriteImpl {
    type Shared = LiveWriteShared;
    type SharedMutable = ();

    fn split(self) -> (Self::Shared, Self::SharedMutable) {
        let shared = LiveWriteShared {
            write_controller: WriteController::new(),
            write_buffer:     WriteBuffer::new(self.write_buffer_size),
        };
        (shared, ())
    }

    fn initialize(shared: LdbLockedFullShared<'_, LDBG, Self>) {
        let (db_shared, db_mutable) = shared;
        recalculate_write_controller(&db_shared.write_data.write_controller, &db_mutable, db_shared);
    }

    fn write(
        shared:      LdbFullShared<'_, LDBG, Self>,
        _options:    (),
        write_batch: &WriteBatch,
    ) -> Result<(), ()> {
        let (db_shared, db_shared_mutable) = shared;

        if write_batch.is_empty() {
            return Ok(());
        }

        db_shared.write_data.write_buffer.wait_if_stalled();
        db_shared.write_data.write_controller.maybe_stall(write_batch.rep().len() as u64);

        let mut db_mutable = db_shared_mutable.write();
        db_mutable.readwrite_status.check_writable().map_err(|_| ())?;

        let last_sequence_before_batch = db_mutable.version_set.last_sequence();
        let base_sequence = last_sequence_before_batch.checked_add(1).map_err(|_| ())?;
        let batch_last_sequence = last_sequence_before_batch
            .checked_add_u32(write_batch.num_entries())
            .map_err(|_| ())?;

        let mut record = Vec::with_capacity(12 + write_batch.rep().len());
        record.extend_from_slice(&base_sequence.inner().to_le_bytes());
        record.extend_from_slice(&write_batch.num_entries().to_le_bytes());
        record.extend_from_slice(write_batch.rep());

        db_mutable.current_log.add_record(&record).map_err(|_| ())?;
        db_mutable.current_log.sync_log_data().map_err(|_| ())?;

        let bytes_before = db_mutable.current_memtable.allocated_bytes();
        {
            // SAFETY: `current_memtable` is only reachable through the database-wide write
            // lock already held via `db_shared_mutable.write()`, so no other writer can be
            // concurrently calling `externally_synchronized` on the same memtable.
            let mut write_access = unsafe { db_mutable.current_memtable.externally_synchronized() };
            write_access.insert_write_batch(write_batch, last_sequence_before_batch);
        }
        let bytes_after = db_mutable.current_memtable.allocated_bytes();
        db_shared.write_data.write_buffer.reserve((bytes_after - bytes_before) as u64);

        db_mutable.version_set.set_last_sequence(batch_last_sequence);

        let should_flush = bytes_after > db_shared.db_options.memtable_size_limit
            || db_shared.write_data.write_buffer.should_flush();

        drop(db_mutable);

        if should_flush {
            Self::compact_memtable(shared)?;
        }

        let db_mutable = db_shared_mutable.read();
        recalculate_write_controller(&db_shared.write_data.write_controller, &db_mutable, db_shared);

        Ok(())
    }

    fn compact_memtable(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()> {
        let (db_shared, _) = shared;
        let flushed_bytes = flush_current_memtable::<LDBG, Self>(shared)?;
        // The flush ran synchronously to completion above, so there's no window where the
        // flushed bytes are pending as a separate immutable memtable; mark then immediately
        // free so the buffer's immutable/free accounting stays consistent for later callers.
        db_shared.write_data.write_buffer.mark_immutable(flushed_bytes);
        db_shared.write_data.write_buffer.free(flushed_bytes);
        Ok(())
    }

    fn compact_range(
        shared:      LdbFullShared<'_, LDBG, Self>,
        lower_bound: Option<UserKey<'_>>,
        upper_bound: Option<UserKey<'_>>,
    ) -> Result<(), ()> {
        compact_levels::<LDBG, Self>(shared, lower_bound, upper_bound)
    }

    fn compact_full(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()> {
        compact_levels::<LDBG, Self>(shared, None, None)
    }

    fn maybe_start_compaction(_shared: LdbLockedFullShared<'_, LDBG, Self>) {
        // Flushes run synchronously on the write path that provokes them; there is no
        // background compaction to kick off here yet.
    }

    fn wait_for_compaction_to_finish(_shared: LdbFullShared<'_, LDBG, Self>) {
        // Nothing runs asynchronously, so there is never anything to wait for.
    }

    fn pending_compaction_outputs(_shared: LdbFullShared<'_, LDBG, Self>) -> HashSet<FileNumber> {
        HashSet::new()
    }

    fn close_writes(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()> {
        let (db_shared, db_shared_mutable) = shared;
        db_shared_mutable.write().readwrite_status = ReadWriteStatus::Closed;
        db_shared.write_data.write_controller.release_write_stall();
        Ok(())
    }

    fn close_writes_after_compaction(shared: LdbFullShared<'_, LDBG, Self>) -> Result<(), ()> {
        // No in-flight compaction can outlive a write call in this synchronous implementation,
        // so there is nothing to let finish first.
        Self::close_writes(shared)
    }
}

fn recalculate_write_controller<LDBG, WriteImpl>(
    write_controller: &WriteController,
    db_mutable:       &crate::inner_leveldb::DBSharedMutable<LDBG, WriteImpl>,
    db_shared:        &crate::inner_leveldb::DBShared<LDBG, WriteImpl>,
)
where
    LDBG:      LevelDBGenerics,
    WriteImpl: DBWriteImpl<LDBG>,
{
    let num_l0_files = u8::try_from(db_mutable.version_set.current().level_files(Level::ZERO).inner().len())
        .unwrap_or(u8::MAX);

    write_controller.recalculate(WriteControllerInputs {
        num_l0_files,
        auto_compactions: db_shared.db_options.perform_automatic_compactions,
        ..WriteControllerInputs::default()
    });
}
