//! Batching queue in front of an evaluator.
//!
//! Self-play workers each submit one leaf at a time. Sending every leaf to a
//! network on its own wastes most of an accelerator, so [`BatchingEvaluator`]
//! runs the wrapped evaluator on a dedicated thread and groups concurrent
//! requests:
//!
//! - block for the first request;
//! - keep collecting until `batch_size` requests are queued or
//!   `batch_timeout_us` has passed since the first one arrived;
//! - run one batched evaluation and answer each request on its own reply
//!   channel.
//!
//! The request queue is a bounded `sync_channel`, so submitters block once
//! `queue_capacity` requests are outstanding.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ContractViolation, EvaluatorError};

use super::traits::{EncodedState, Evaluation, Evaluator};

/// Batching queue parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Largest batch handed to the wrapped evaluator.
    pub batch_size: usize,

    /// Longest wait after the first request of a batch (microseconds).
    pub batch_timeout_us: u64,

    /// Bound on outstanding requests.
    pub queue_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            batch_timeout_us: 500,
            queue_capacity: 1024,
        }
    }
}

impl BatchConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout_us = timeout.as_micros() as u64;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Counters describing how well requests were batched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Batched evaluations performed.
    pub batches: u64,

    /// Individual states evaluated.
    pub requests: u64,

    /// Size of the largest batch so far.
    pub largest_batch: usize,
}

impl BatchStats {
    #[must_use]
    pub fn mean_batch_size(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.requests as f64 / self.batches as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    batches: AtomicU64,
    requests: AtomicU64,
    largest_batch: AtomicUsize,
}

type Reply = Result<Evaluation, EvaluatorError>;

struct Request {
    state: EncodedState,
    reply: SyncSender<Reply>,
}

/// Evaluator that funnels requests from many threads into batches.
pub struct BatchingEvaluator {
    sender: Mutex<Option<SyncSender<Request>>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl BatchingEvaluator {
    /// Start the inference thread around `inner`.
    pub fn spawn<E: Evaluator + 'static>(inner: E, config: BatchConfig) -> Self {
        let (tx, rx) = mpsc::sync_channel::<Request>(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);

        let worker = thread::Builder::new()
            .name("batch-evaluator".into())
            .spawn(move || run_worker(inner, rx, config, worker_counters))
            .ok();
        if worker.is_none() {
            warn!("failed to spawn batch evaluator thread; requests will fail");
        }

        Self {
            sender: Mutex::new(worker.as_ref().map(|_| tx)),
            worker,
            counters,
        }
    }

    #[must_use]
    pub fn stats(&self) -> BatchStats {
        BatchStats {
            batches: self.counters.batches.load(Ordering::Relaxed),
            requests: self.counters.requests.load(Ordering::Relaxed),
            largest_batch: self.counters.largest_batch.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting requests and wait for the inference thread to drain.
    pub fn shutdown(mut self) -> BatchStats {
        self.close();
        self.stats()
    }

    fn close(&mut self) {
        let sender = match self.sender.get_mut() {
            Ok(sender) => sender.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("batch evaluator thread panicked");
            }
        }
    }

    fn sender(&self) -> Result<SyncSender<Request>, EvaluatorError> {
        let guard = self.sender.lock().map_err(|_| EvaluatorError::QueueClosed)?;
        guard.clone().ok_or(EvaluatorError::QueueClosed)
    }
}

impl Evaluator for BatchingEvaluator {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
        let sender = self.sender()?;
        let mut replies = Vec::with_capacity(batch.len());
        for state in batch {
            let (reply, receiver) = mpsc::sync_channel(1);
            sender
                .send(Request {
                    state: state.clone(),
                    reply,
                })
                .map_err(|_| EvaluatorError::QueueClosed)?;
            replies.push(receiver);
        }

        replies
            .into_iter()
            .map(|receiver| receiver.recv().map_err(|_| EvaluatorError::QueueClosed)?)
            .collect()
    }
}

impl Drop for BatchingEvaluator {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker<E: Evaluator>(
    inner: E,
    rx: Receiver<Request>,
    config: BatchConfig,
    counters: Arc<Counters>,
) {
    let max_batch = config.batch_size.max(1);
    let timeout = Duration::from_micros(config.batch_timeout_us);

    while let Ok(first) = rx.recv() {
        let deadline = Instant::now() + timeout;
        let mut pending = Vec::with_capacity(max_batch);
        pending.push(first);

        while pending.len() < max_batch {
            match rx.try_recv() {
                Ok(request) => {
                    pending.push(request);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match rx.recv_timeout(remaining) {
                Ok(request) => pending.push(request),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }

        dispatch(&inner, pending, &counters);
    }

    debug!("batch evaluator queue closed");
}

fn dispatch<E: Evaluator>(inner: &E, pending: Vec<Request>, counters: &Counters) {
    let (states, replies): (Vec<_>, Vec<_>) =
        pending.into_iter().map(|r| (r.state, r.reply)).unzip();

    counters.batches.fetch_add(1, Ordering::Relaxed);
    counters.requests.fetch_add(states.len() as u64, Ordering::Relaxed);
    counters.largest_batch.fetch_max(states.len(), Ordering::Relaxed);

    match inner.evaluate(&states) {
        Ok(results) if results.len() == replies.len() => {
            for (reply, result) in replies.into_iter().zip(results) {
                // A submitter that gave up is not our problem.
                let _ = reply.send(Ok(result));
            }
        }
        Ok(results) => {
            let err: EvaluatorError = ContractViolation::BatchSizeMismatch {
                expected: replies.len(),
                actual: results.len(),
            }
            .into();
            warn!(error = %err, "evaluator broke batch contract");
            for reply in replies {
                let _ = reply.send(Err(err.clone()));
            }
        }
        Err(err) => {
            warn!(error = %err, batch = states.len(), "batched evaluation failed");
            for reply in replies {
                let _ = reply.send(Err(err.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::UniformEvaluator;

    /// Echoes the first input feature into the score so replies can be
    /// matched to requests.
    struct Echo;

    impl Evaluator for Echo {
        fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
            Ok(batch
                .iter()
                .map(|s| Evaluation::new(vec![1.0], vec![0.0], s.tensor[0]))
                .collect())
        }
    }

    #[test]
    fn test_single_request_roundtrip() {
        let evaluator = BatchingEvaluator::spawn(UniformEvaluator::new(3, 2), BatchConfig::default());
        let eval = evaluator.evaluate_one(&EncodedState::zeros(vec![4])).unwrap();
        assert_eq!(eval.policy.len(), 3);
        assert_eq!(eval.values.len(), 2);

        let stats = evaluator.shutdown();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.batches, 1);
    }

    #[test]
    fn test_multi_state_call_preserves_order() {
        let evaluator = BatchingEvaluator::spawn(Echo, BatchConfig::default().with_batch_size(4));
        let batch: Vec<_> = (0..10).map(|i| EncodedState::flat(vec![i as f32])).collect();
        let results = evaluator.evaluate(&batch).unwrap();
        let scores: Vec<f32> = results.iter().map(|e| e.score).collect();
        assert_eq!(scores, (0..10).map(|i| i as f32).collect::<Vec<_>>());
        assert!(evaluator.stats().largest_batch <= 4);
    }

    #[test]
    fn test_failures_reach_every_submitter() {
        struct Failing;
        impl Evaluator for Failing {
            fn evaluate(&self, _batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
                Err(EvaluatorError::Failed("device lost".into()))
            }
        }

        let evaluator = BatchingEvaluator::spawn(Failing, BatchConfig::default());
        let err = evaluator.evaluate_one(&EncodedState::zeros(vec![1])).unwrap_err();
        assert_eq!(err, EvaluatorError::Failed("device lost".into()));
    }

    #[test]
    fn test_stats_mean() {
        let stats = BatchStats {
            batches: 4,
            requests: 10,
            largest_batch: 4,
        };
        assert_eq!(stats.mean_batch_size(), 2.5);
        assert_eq!(BatchStats::default().mean_batch_size(), 0.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = BatchConfig::default().with_batch_size(8).with_timeout(Duration::from_millis(2));
        assert_eq!(config.batch_timeout_us, 2000);
        let json = serde_json::to_string(&config).unwrap();
        let back: BatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
