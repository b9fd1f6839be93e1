//! Bounded producer → workers → aggregator pipeline
//!
//! A single producer (the calling thread) pulls items from a fallible
//! iterator and pushes them, tagged with a sequence number, onto a bounded
//! work queue. A fixed set of workers applies a stateless function to each
//! item and pushes the result onto a bounded result queue. One aggregator
//! thread folds the results back together in producer order.
//!
//! Every blocking queue operation also watches the caller's
//! [`CancellationToken`] and an internal abort token, so a stop request or
//! a failing stage never leaves a thread parked on a full or empty queue.

use std::collections::BTreeMap;
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::parallel::{default_num_threads, CancellationToken};
use crate::engines::{EngineError, EngineResult};

/// Queue slots per worker when no explicit capacity is configured
const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Sizing of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Capacity of the work queue and of the result queue
    pub queue_capacity: usize,
}

impl PipelineConfig {
    /// Configuration with `workers` threads and a matching queue capacity
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: workers * QUEUE_SLOTS_PER_WORKER,
        }
    }

    /// Reject configurations that cannot make progress
    pub fn validate(&self) -> EngineResult<()> {
        if self.workers == 0 {
            return Err(EngineError::invalid("workers", "must be greater than zero"));
        }
        if self.queue_capacity == 0 {
            return Err(EngineError::invalid(
                "queue_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_workers(default_num_threads())
    }
}

/// First error raised by any stage; later errors are dropped
struct FailureSlot {
    first: Mutex<Option<EngineError>>,
    abort: CancellationToken,
}

impl FailureSlot {
    fn new() -> Self {
        Self {
            first: Mutex::new(None),
            abort: CancellationToken::new(),
        }
    }

    fn fail(&self, err: EngineError) {
        {
            let mut first = self.first.lock();
            if first.is_none() {
                log::warn!("pipeline stage failed: {}", err);
                *first = Some(err);
            }
        }
        self.abort.cancel();
    }

    fn take(&self) -> Option<EngineError> {
        self.first.lock().take()
    }
}

/// A configured pipeline bound to a caller's cancellation token
pub struct Pipeline<'a> {
    config: PipelineConfig,
    token: &'a CancellationToken,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline; the configuration is validated here
    pub fn new(config: PipelineConfig, token: &'a CancellationToken) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config, token })
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline to completion
    ///
    /// `source` is drained on the calling thread. `work` runs on the worker
    /// threads. `fold` runs on the aggregator thread and sees results in
    /// exactly the order `source` produced the corresponding items.
    ///
    /// Returns [`EngineError::Cancelled`] if the token was triggered, the
    /// first producer or worker error otherwise. In both cases anything
    /// folded so far is discarded.
    pub fn run<I, T, R, A, W, F>(&self, source: I, work: W, init: A, fold: F) -> EngineResult<A>
    where
        I: IntoIterator<Item = EngineResult<T>>,
        T: Send,
        R: Send,
        A: Send,
        W: Fn(T) -> EngineResult<R> + Sync,
        F: FnMut(&mut A, R) + Send,
    {
        if self.token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        log::debug!(
            "starting pipeline with {} workers, queue capacity {}",
            self.config.workers,
            self.config.queue_capacity
        );

        let failure = FailureSlot::new();
        let (work_tx, work_rx) = bounded::<(u64, T)>(self.config.queue_capacity);
        let (result_tx, result_rx) = bounded::<(u64, R)>(self.config.queue_capacity);

        let outcome = thread::scope(|scope| {
            let aggregator = thread::Builder::new()
                .name("genostat-aggregator".to_string())
                .spawn_scoped(scope, move || aggregate(result_rx, init, fold));
            let aggregator = match aggregator {
                Ok(handle) => handle,
                Err(err) => return Err(EngineError::Spawn(err)),
            };

            for idx in 0..self.config.workers {
                let rx = work_rx.clone();
                let tx = result_tx.clone();
                let (work, failure, token) = (&work, &failure, self.token);
                let spawned = thread::Builder::new()
                    .name(format!("genostat-worker-{}", idx))
                    .spawn_scoped(scope, move || worker(rx, tx, work, failure, token));
                if let Err(err) = spawned {
                    failure.fail(EngineError::Spawn(err));
                    break;
                }
            }
            // Only the workers hold these now; the aggregator stops once they exit
            drop(work_rx);
            drop(result_tx);

            let produced = produce(source, work_tx, &failure, self.token);
            log::debug!("producer finished after {} items", produced);

            match aggregator.join() {
                Ok(acc) => Ok(acc),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })?;

        if self.token.is_cancelled() {
            log::info!("pipeline cancelled by caller");
            return Err(EngineError::Cancelled);
        }
        if let Some(err) = failure.take() {
            return Err(err);
        }
        Ok(outcome)
    }
}

/// Feed the work queue; returns the number of items enqueued
fn produce<I, T>(
    source: I,
    work_tx: Sender<(u64, T)>,
    failure: &FailureSlot,
    token: &CancellationToken,
) -> u64
where
    I: IntoIterator<Item = EngineResult<T>>,
{
    let mut seq = 0u64;
    for item in source {
        if token.is_cancelled() || failure.abort.is_cancelled() {
            break;
        }
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                failure.fail(err);
                break;
            }
        };
        let sent = select! {
            send(work_tx, (seq, item)) -> res => res.is_ok(),
            recv(token.signal()) -> _ => false,
            recv(failure.abort.signal()) -> _ => false,
        };
        if !sent {
            break;
        }
        seq += 1;
    }
    seq
}

fn worker<T, R, W>(
    work_rx: Receiver<(u64, T)>,
    result_tx: Sender<(u64, R)>,
    work: &W,
    failure: &FailureSlot,
    token: &CancellationToken,
) where
    W: Fn(T) -> EngineResult<R>,
{
    loop {
        if token.is_cancelled() || failure.abort.is_cancelled() {
            break;
        }
        let next = select! {
            recv(work_rx) -> msg => msg.ok(),
            recv(token.signal()) -> _ => None,
            recv(failure.abort.signal()) -> _ => None,
        };
        let Some((seq, item)) = next else {
            break;
        };

        match work(item) {
            Ok(result) => {
                let sent = select! {
                    send(result_tx, (seq, result)) -> res => res.is_ok(),
                    recv(token.signal()) -> _ => false,
                    recv(failure.abort.signal()) -> _ => false,
                };
                if !sent {
                    break;
                }
            }
            Err(err) => {
                failure.fail(err);
                break;
            }
        }
    }
}

/// Fold results in sequence-number order
fn aggregate<R, A, F>(result_rx: Receiver<(u64, R)>, mut acc: A, mut fold: F) -> A
where
    F: FnMut(&mut A, R),
{
    let mut pending: BTreeMap<u64, R> = BTreeMap::new();
    let mut next = 0u64;

    for (seq, result) in result_rx.iter() {
        pending.insert(seq, result);
        while let Some(result) = pending.remove(&next) {
            fold(&mut acc, result);
            next += 1;
        }
    }

    if !pending.is_empty() {
        // only reachable when a stage stopped early; the caller discards `acc`
        log::debug!("aggregator dropped {} out-of-order results", pending.len());
    }
    acc
}
