//! Single background thread driving flushes and compactions (§4.15).
//!
//! Kept decoupled from [`crate::leveldb_generics::LevelDBGenerics`] the same way
//! [`crate::compaction::CompactionPicker`] is: the worker itself only understands "a flush job
//! ran" and "a compaction job ran," not memtables or SSTs. The closures supplied to
//! [`BackgroundWorker::spawn`] are where the generic DB core plugs in its actual flush/compaction
//! logic; this keeps the scheduling loop testable without a full `LevelDBGenerics` instantiation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, select, Sender};
use parking_lot::{Condvar, Mutex};

/// Outcome of a single flush or compaction attempt, used only to decide whether to immediately
/// re-signal compaction (a completed compaction may have produced a new L0 file, or left the
/// column family still over its trigger threshold).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    Done,
    /// More work of the same kind is immediately pending (e.g. another level needs compacting).
    MoreWork,
    Failed,
}

struct PauseState {
    paused: bool,
}

/// Handle to the running background thread. Dropping this does not join the thread; call
/// [`Self::shutdown`] for an orderly stop.
pub(crate) struct BackgroundWorker {
    flush_tx:      Sender<()>,
    compaction_tx: Sender<()>,
    shutdown_tx:   Sender<()>,
    pause:         Arc<(Mutex<PauseState>, Condvar)>,
    handle:        Option<JoinHandle<()>>,
}

impl BackgroundWorker {
    /// Spawn the worker thread. `run_flush` and `run_compaction` are invoked with no job-specific
    /// arguments (the DB core closes over whatever shared state it needs); each returns a
    /// [`JobOutcome`] that determines whether the corresponding signal is immediately reposted.
    pub fn spawn<RunFlush, RunCompaction>(run_flush: RunFlush, run_compaction: RunCompaction) -> Self
    where
        RunFlush: Fn() -> JobOutcome + Send + 'static,
        RunCompaction: Fn() -> JobOutcome + Send + 'static,
    {
        let (flush_tx, flush_rx) = bounded::<()>(1);
        let (compaction_tx, compaction_rx) = bounded::<()>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let pause = Arc::new((Mutex::new(PauseState { paused: false }), Condvar::new()));

        let worker_pause = Arc::clone(&pause);
        let worker_flush_tx = flush_tx.clone();
        let worker_compaction_tx = compaction_tx.clone();

        let handle = std::thread::Builder::new()
            .name("ember-kv-background".to_owned())
            .spawn(move || loop {
                select! {
                    recv(shutdown_rx) -> _ => return,
                    recv(flush_rx) -> _ => {
                        Self::wait_while_paused(&worker_pause);
                        if run_flush() == JobOutcome::MoreWork {
                            let _ = worker_flush_tx.try_send(());
                        }
                    },
                    recv(compaction_rx) -> _ => {
                        Self::wait_while_paused(&worker_pause);
                        if run_compaction() == JobOutcome::MoreWork {
                            let _ = worker_compaction_tx.try_send(());
                        }
                    },
                }
            })
            .expect("failed to spawn background worker thread");

        Self { flush_tx, compaction_tx, shutdown_tx, pause, handle: Some(handle) }
    }

    fn wait_while_paused(pause: &Arc<(Mutex<PauseState>, Condvar)>) {
        let (lock, cvar) = pause.as_ref();
        let mut state = lock.lock();
        while state.paused {
            cvar.wait(&mut state);
        }
    }

    /// Request a flush run. A no-op if a flush signal is already pending (the channel has
    /// capacity one, matching the spec's "flushes and compactions are each single-slot signals,
    /// not queues" requirement — redundant signals coalesce).
    pub fn signal_flush(&self) {
        let _ = self.flush_tx.try_send(());
    }

    /// Request a compaction run. See [`Self::signal_flush`] for the coalescing behavior.
    pub fn signal_compaction(&self) {
        let _ = self.compaction_tx.try_send(());
    }

    /// Pause the worker after its current job (if any) finishes; it will not start a new job
    /// until [`Self::resume`] is called.
    pub fn pause(&self) {
        let (lock, _cvar) = self.pause.as_ref();
        lock.lock().paused = true;
    }

    pub fn resume(&self) {
        let (lock, cvar) = self.pause.as_ref();
        lock.lock().paused = false;
        cvar.notify_all();
    }

    /// Stop the worker and block until its thread exits. Safe to call more than once.
    pub fn shutdown(&mut self) {
        // Unpause first: a paused worker blocked in `wait_while_paused` would otherwise never
        // reach the `select!` that observes `shutdown_tx`.
        self.resume();
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn signal_flush_runs_the_flush_closure() {
        let flush_count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&flush_count);

        let mut worker = BackgroundWorker::spawn(
            move || { counter.fetch_add(1, Ordering::SeqCst); JobOutcome::Done },
            || JobOutcome::Done,
        );
        worker.signal_flush();

        // Give the worker thread a moment to process the signal.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(flush_count.load(Ordering::SeqCst), 1);
        worker.shutdown();
    }

    #[test]
    fn more_work_outcome_reposts_the_signal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut worker = BackgroundWorker::spawn(
            || JobOutcome::Done,
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 { JobOutcome::MoreWork } else { JobOutcome::Done }
            },
        );
        worker.signal_compaction();

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        worker.shutdown();
    }

    #[test]
    fn pause_blocks_job_execution_until_resumed() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let mut worker = BackgroundWorker::spawn(
            move || { flag.store(true, Ordering::SeqCst); JobOutcome::Done },
            || JobOutcome::Done,
        );
        worker.pause();
        worker.signal_flush();

        std::thread::sleep(Duration::from_millis(50));
        assert!(!ran.load(Ordering::SeqCst));

        worker.resume();
        std::thread::sleep(Duration::from_millis(50));
        assert!(ran.load(Ordering::SeqCst));

        worker.shutdown();
    }
}
