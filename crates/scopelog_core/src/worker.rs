//! Background write worker.
//!
//! Each scope owns at most one worker thread. Jobs run strictly in
//! submission order. The queue is bounded; a full queue rejects the job
//! instead of blocking the submitter.

use crate::error::{CoreError, CoreResult};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single-threaded FIFO executor.
pub(crate) struct WriteWorker {
    sender: Option<SyncSender<Job>>,
    handle: Option<JoinHandle<()>>,
    done: Receiver<()>,
    thread_id: ThreadId,
    capacity: usize,
}

impl WriteWorker {
    /// Spawns the worker thread with a queue of `capacity` jobs.
    pub(crate) fn spawn(name: String, capacity: usize) -> CoreResult<Self> {
        let (sender, receiver) = mpsc::sync_channel::<Job>(capacity);
        let (done_tx, done) = mpsc::channel();

        let handle = thread::Builder::new().name(name).spawn(move || {
            tracing::debug!("write worker started");
            for job in receiver {
                job();
            }
            tracing::debug!("write worker stopped");
            let _ = done_tx.send(());
        })?;
        let thread_id = handle.thread().id();

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            done,
            thread_id,
            capacity,
        })
    }

    /// Queues a job without blocking.
    pub(crate) fn submit(&self, job: Job) -> CoreResult<()> {
        let sender = self.sender.as_ref().ok_or(CoreError::WorkerShutdown)?;
        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => CoreError::WriteQueueFull {
                capacity: self.capacity,
            },
            TrySendError::Disconnected(_) => CoreError::WorkerShutdown,
        })
    }

    /// Stops accepting jobs and waits up to `timeout` for the queue to drain.
    ///
    /// Returns false if the worker was still busy when the timeout expired;
    /// the thread is then detached and finishes its queue on its own.
    pub(crate) fn shutdown(&mut self, timeout: Duration) -> bool {
        drop(self.sender.take());

        // Called from inside a job (the scope's last owner was a queued
        // write): waiting here would wait on ourselves.
        if thread::current().id() == self.thread_id {
            self.handle.take();
            return true;
        }

        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        tracing::error!("write worker panicked");
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs_f64(),
                    "write worker did not drain before shutdown timeout"
                );
                self.handle.take();
                false
            }
        }
    }
}

impl Drop for WriteWorker {
    fn drop(&mut self) {
        // Detach; the thread exits once its queue is empty.
        drop(self.sender.take());
    }
}

/// Handle to the result of a queued write.
///
/// The result is the byte count `try_write` returned, or its error. If the
/// worker stops before running the write, the result is `WorkerShutdown`.
#[derive(Debug)]
pub struct PendingWrite {
    receiver: Receiver<CoreResult<usize>>,
}

impl PendingWrite {
    pub(crate) fn new(receiver: Receiver<CoreResult<usize>>) -> Self {
        Self { receiver }
    }

    /// Blocks until the write has run.
    pub fn wait(self) -> CoreResult<usize> {
        self.receiver
            .recv()
            .unwrap_or(Err(CoreError::WorkerShutdown))
    }

    /// Waits at most `timeout`; `None` if the write has not run yet.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CoreResult<usize>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(CoreError::WorkerShutdown)),
        }
    }

    /// Returns the result if the write has already run.
    pub fn try_result(&self) -> Option<CoreResult<usize>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CoreError::WorkerShutdown)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn jobs_run_in_order() {
        let mut worker = WriteWorker::spawn("test-worker".into(), 16).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let seen = Arc::clone(&seen);
            worker
                .submit(Box::new(move || seen.lock().unwrap().push(i)))
                .unwrap();
        }

        assert!(worker.shutdown(Duration::from_secs(5)));
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn full_queue_is_rejected() {
        let worker = WriteWorker::spawn("test-worker".into(), 1).unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();

        worker
            .submit(Box::new(move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            }))
            .unwrap();
        started_rx.recv().unwrap();

        // One slot in the queue, the running job is not counted.
        worker.submit(Box::new(|| {})).unwrap();
        let rejected = worker.submit(Box::new(|| {}));
        assert!(matches!(
            rejected,
            Err(CoreError::WriteQueueFull { capacity: 1 })
        ));

        release_tx.send(()).unwrap();
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let mut worker = WriteWorker::spawn("test-worker".into(), 4).unwrap();
        assert!(worker.shutdown(Duration::from_secs(5)));
        assert!(matches!(
            worker.submit(Box::new(|| {})),
            Err(CoreError::WorkerShutdown)
        ));
    }

    #[test]
    fn pending_write_reports_dropped_sender() {
        let (tx, rx) = mpsc::sync_channel(1);
        let pending = PendingWrite::new(rx);
        assert!(pending.try_result().is_none());
        drop(tx);
        assert!(matches!(
            pending.wait_timeout(Duration::from_millis(10)),
            Some(Err(CoreError::WorkerShutdown))
        ));
    }

    #[test]
    fn pending_write_delivers_result() {
        let (tx, rx) = mpsc::sync_channel(1);
        let pending = PendingWrite::new(rx);
        tx.send(Ok(12)).unwrap();
        assert_eq!(pending.wait().unwrap(), 12);
    }
}
