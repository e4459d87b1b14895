use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::runner::panic_message;
use crate::pipeline::{BatchSummary, Pipeline};

/// Result of running one batch on a worker.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_path: PathBuf,
    pub result: Result<BatchSummary, String>,
}

/// Runs whole batches on a fixed set of threads. Batches own disjoint jobs,
/// so no two workers ever touch the same job record.
pub struct WorkerPool {
    batch_sender: Sender<PathBuf>,
    result_receiver: Receiver<BatchOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(pipeline: Arc<Pipeline>, worker_count: usize) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }
        let (batch_sender, batch_receiver) = bounded::<PathBuf>(worker_count * 2);
        // Unbounded so a worker never blocks on a caller that is still submitting.
        let (result_sender, result_receiver) = unbounded::<BatchOutcome>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let batch_rx = batch_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = Arc::clone(&pipeline);

            let handle = thread::Builder::new()
                .name(format!("lens-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, batch_rx, result_tx, shutdown_flag, worker_pipeline);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            batch_sender,
            result_receiver,
            workers,
            shutdown,
        })
    }

    /// Queues a batch file; blocks while the queue is full.
    pub fn submit(&self, batch_path: PathBuf) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.batch_sender
            .send(batch_path)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<BatchOutcome> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<BatchOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Dropping the sender lets idle workers exit.
        drop(self.batch_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    batch_receiver: Receiver<PathBuf>,
    result_sender: Sender<BatchOutcome>,
    shutdown: Arc<AtomicBool>,
    pipeline: Arc<Pipeline>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match batch_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(batch_path) => {
                debug!("Worker {} processing batch: {:?}", worker_id, batch_path);

                // Every submitted batch gets an outcome, even one that panics.
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    pipeline.run_batch(&batch_path).map_err(|e| e.to_string())
                }))
                .unwrap_or_else(|payload| {
                    Err(format!("batch panicked: {}", panic_message(payload.as_ref())))
                });
                if let Err(ref e) = result {
                    error!("Batch {:?} could not be run: {}", batch_path, e);
                }

                if let Err(e) = result_sender.send(BatchOutcome { batch_path, result }) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} batch channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
