//! Fixed-size pool of named invocation worker threads.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::error::BridgeError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Reusable workers fed from a shared queue.
///
/// Jobs beyond the pool size queue until a worker frees up. Shutting down
/// stops accepting jobs but never joins: a worker may be parked on an
/// unanswered prompt indefinitely.
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, BridgeError> {
        let size = size.max(1);
        let (sender, receiver) = channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        for index in 0..size {
            let receiver = Arc::clone(&receiver);
            thread::Builder::new()
                .name(format!("invoke-worker-{index}"))
                .spawn(move || worker_loop(receiver))
                .map_err(|e| BridgeError::WorkerPool(format!("cannot spawn worker: {e}")))?;
        }

        tracing::debug!(size, "worker pool started");
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn execute<F>(&self, job: F) -> Result<(), BridgeError>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(BridgeError::WorkerPool("pool is shut down".to_string()));
        };
        sender
            .send(Box::new(job))
            .map_err(|_| BridgeError::WorkerPool("all workers have exited".to_string()))
    }

    /// Stop accepting jobs. Idle workers exit once the queue drains.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            tracing::debug!("worker pool shutting down");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = receiver.lock().recv();
        let Ok(job) = job else {
            break;
        };
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::warn!("invocation job panicked; worker continues");
        }
    }
}
