//! Parallel processing primitives
//!
//! This module owns the process-wide rayon pool used for in-memory work,
//! the chunking helpers that split large payloads for it, and the
//! cancellation token shared by the streaming pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};

// Global thread pool for in-memory parallel operations; `None` if the OS
// refused to start any worker thread
static GLOBAL_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

// Minimum chunks handed to each thread so work-stealing has room to balance
const MIN_CHUNKS_PER_THREAD: usize = 4;

// Chunk boundaries are rounded to this many bytes
const CHUNK_ALIGNMENT: usize = 1024;

/// Get the default number of threads to use
pub fn default_num_threads() -> usize {
    num_cpus::get().max(1)
}

/// Get the global thread pool, building it on first use
///
/// Falls back to a single-threaded pool if the OS refuses to start the
/// requested number of threads, and returns `None` if even that fails.
/// Callers then run their work on the current thread.
pub fn global_pool() -> Option<&'static ThreadPool> {
    GLOBAL_POOL
        .get_or_init(|| {
            let num_threads = default_num_threads();
            let pool = ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|idx| format!("genostat-pool-{}", idx))
                .build();

            match pool {
                Ok(pool) => {
                    log::info!("Initialized thread pool with {} threads", num_threads);
                    Some(pool)
                }
                Err(err) => {
                    log::warn!("Falling back to a single-threaded pool: {}", err);
                    match ThreadPoolBuilder::new().num_threads(1).build() {
                        Ok(pool) => Some(pool),
                        Err(err) => {
                            log::warn!("No thread pool available, running inline: {}", err);
                            None
                        }
                    }
                }
            }
        })
        .as_ref()
}

/// Number of threads available to in-memory parallel work
pub fn pool_threads() -> usize {
    global_pool().map_or(1, ThreadPool::current_num_threads)
}

/// Calculate optimal chunk size for parallel processing
pub fn calculate_chunk_size(total_size: usize, min_chunk_size: Option<usize>) -> usize {
    let num_threads = pool_threads();
    let min_size = min_chunk_size.unwrap_or(CHUNK_ALIGNMENT).max(1);

    let total_chunks = num_threads * MIN_CHUNKS_PER_THREAD;
    let chunk_size = (total_size / total_chunks).max(min_size);

    chunk_size.div_ceil(CHUNK_ALIGNMENT) * CHUNK_ALIGNMENT
}

/// Chunk a slice into optimally sized chunks for parallel processing
pub fn chunk_slice<T>(slice: &[T], min_chunk_size: Option<usize>) -> Vec<&[T]> {
    let chunk_size = calculate_chunk_size(slice.len(), min_chunk_size);
    slice.chunks(chunk_size).collect()
}

/// Cooperative cancellation signal shared by every stage of a pipeline
///
/// Cloning the token yields a handle to the same signal. Once
/// [`cancel`](Self::cancel) has been called, [`signal`](Self::signal)
/// becomes permanently ready so that blocked channel operations can
/// `select!` on it.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    // Dropping the sender disconnects `signal`, which wakes every receiver
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancellationToken {
    /// Create a new, untriggered token
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Trigger cancellation; idempotent
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.trigger.lock().take();
        }
    }

    /// Whether cancellation has been triggered
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the token is cancelled
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
