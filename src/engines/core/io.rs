//! Byte sources for the streaming engines
//!
//! The tokenizer pulls fixed-size chunks from any [`Read`]. This module
//! provides the chunked read loop (with `Interrupted` retries) and a
//! metering wrapper that records how many bytes a pipeline consumed.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default read buffer size (4 MiB)
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 << 20;

/// Read one chunk into `buffer`, retrying on `Interrupted`
///
/// Returns `Ok(0)` only at end of stream.
pub fn read_chunk<R: Read + ?Sized>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Shared byte counter handed out by a [`MeteredReader`]
#[derive(Debug, Clone, Default)]
pub struct ReadStats {
    bytes_read: Arc<AtomicU64>,
}

impl ReadStats {
    /// Bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    fn record(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// A reader that counts the bytes passing through it
pub struct MeteredReader<R> {
    inner: R,
    stats: ReadStats,
}

impl<R: Read> MeteredReader<R> {
    /// Wrap a reader
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            stats: ReadStats::default(),
        }
    }

    /// Handle to the byte counter, usable after the reader has been moved
    pub fn stats(&self) -> ReadStats {
        self.stats.clone()
    }

    /// Unwrap the inner reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl MeteredReader<File> {
    /// Open a file for metered reading
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> Read for MeteredReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.stats.record(n);
        Ok(n)
    }
}
