use std::ops::Range;
use std::sync::{
    Arc,
    mpsc::{self, Receiver, Sender},
};
use std::thread::JoinHandle;

use super::partition::partition;
use crate::error::StateError;
use crate::pool::{Pool, PoolEvaluator, PoolOutput};

/// One prediction request as seen by a worker.
struct Job {
    query: Arc<[f32]>,
    reply: Sender<WorkerReply>,
}

enum WorkerMessage {
    Evaluate(Job),
    Stop,
}

struct WorkerReply {
    worker: usize,
    start: usize,
    outputs: Vec<PoolOutput>,
}

struct WorkerHandle {
    jobs: Sender<WorkerMessage>,
    range: Range<usize>,
    thread: Option<JoinHandle<()>>,
}

/// Fixed set of worker threads, each owning a contiguous slice of pools.
///
/// Threads are spawned once and park on their job channel between requests.
/// A request is delivered to every worker and completes only after every
/// worker has replied, so exactly one request is in flight at a time.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    pool_count: usize,
}

impl WorkerPool {
    /// Spawn `worker_count` threads over `pools`. `worker_count` must be in `1..=pools.len()`.
    pub fn spawn(pools: Arc<[Pool]>, evaluator: &PoolEvaluator, worker_count: usize) -> Self {
        let pool_count = pools.len();
        let workers = partition(pool_count, worker_count)
            .into_iter()
            .enumerate()
            .map(|(worker, range)| {
                let (jobs, inbox) = mpsc::channel::<WorkerMessage>();
                let pools = Arc::clone(&pools);
                let evaluator = evaluator.clone();
                let thread_range = range.clone();
                let thread = std::thread::spawn(move || {
                    run_worker(worker, thread_range, pools, evaluator, inbox);
                });
                WorkerHandle {
                    jobs,
                    range,
                    thread: Some(thread),
                }
            })
            .collect();
        Self {
            workers,
            pool_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Pool ranges assigned to each worker.
    pub fn ranges(&self) -> Vec<Range<usize>> {
        self.workers.iter().map(|w| w.range.clone()).collect()
    }

    /// Evaluate every pool for `query`, returning outputs in pool order.
    pub fn run(&mut self, query: Arc<[f32]>) -> Result<Vec<PoolOutput>, StateError> {
        let (reply_tx, reply_rx) = mpsc::channel::<WorkerReply>();
        for (worker, handle) in self.workers.iter().enumerate() {
            let job = Job {
                query: Arc::clone(&query),
                reply: reply_tx.clone(),
            };
            handle
                .jobs
                .send(WorkerMessage::Evaluate(job))
                .map_err(|_| StateError::WorkerUnavailable { worker })?;
        }
        drop(reply_tx);

        let expected = self.workers.len();
        let mut slots: Vec<Option<PoolOutput>> = (0..self.pool_count).map(|_| None).collect();
        for received in 0..expected {
            let reply = reply_rx
                .recv()
                .map_err(|_| StateError::WorkerDisconnected { received, expected })?;
            let range = self
                .workers
                .get(reply.worker)
                .map(|handle| handle.range.clone())
                .ok_or(StateError::RangeMismatch {
                    worker: reply.worker,
                })?;
            if reply.start != range.start || reply.outputs.len() != range.len() {
                return Err(StateError::RangeMismatch {
                    worker: reply.worker,
                });
            }
            for (slot, output) in slots[range].iter_mut().zip(reply.outputs) {
                *slot = Some(output);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(pool, slot)| slot.ok_or(StateError::MissingResult { pool }))
            .collect()
    }

    /// Stop every worker and wait for it to exit. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        for handle in &self.workers {
            let _ = handle.jobs.send(WorkerMessage::Stop);
        }
        for (worker, handle) in self.workers.iter_mut().enumerate() {
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    tracing::warn!("Worker {worker} panicked before shutdown");
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    worker: usize,
    range: Range<usize>,
    pools: Arc<[Pool]>,
    mut evaluator: PoolEvaluator,
    inbox: Receiver<WorkerMessage>,
) {
    tracing::trace!("Worker {worker} started for pools {range:?}");
    while let Ok(message) = inbox.recv() {
        let job = match message {
            WorkerMessage::Evaluate(job) => job,
            WorkerMessage::Stop => break,
        };
        let outputs = pools[range.clone()]
            .iter()
            .map(|pool| evaluator.evaluate(pool, &job.query))
            .collect();
        let reply = WorkerReply {
            worker,
            start: range.start,
            outputs,
        };
        if job.reply.send(reply).is_err() {
            tracing::debug!("Worker {worker} reply dropped; request was abandoned");
        }
    }
    tracing::trace!("Worker {worker} exiting");
}
