//! Windowed GC skew
//!
//! Skew for a window is `(G - C) / (G + C)`, or `0.0` when the window holds
//! neither base. Windows close every `step_size` bytes; they do not overlap
//! in the tally sense even when `step_size < window_size`.
//!
//! Streaming input is cut into window-sized tasks by [`WindowTasks`], which
//! keeps one [`RollingBuffer`] for the accession currently being read. Each
//! task is evaluated independently with [`compute_windows`] and the results
//! are appended to that accession's series in task order.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::engines::core::io::DEFAULT_READ_BUFFER_SIZE;
use crate::engines::core::lookup::{BaseClass, CasePolicy};
use crate::engines::storage::formats::{FastaScanner, ScanEvent};
use crate::engines::{EngineError, EngineResult};

/// Window geometry, validated on construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    window_size: usize,
    step_size: usize,
}

impl WindowParams {
    /// Both sizes must be greater than zero
    pub fn new(window_size: usize, step_size: usize) -> EngineResult<Self> {
        if window_size == 0 {
            return Err(EngineError::invalid("window_size", "must be greater than zero"));
        }
        if step_size == 0 {
            return Err(EngineError::invalid("step_size", "must be greater than zero"));
        }
        Ok(Self {
            window_size,
            step_size,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn step_size(&self) -> usize {
        self.step_size
    }
}

#[inline]
fn skew(g: u64, c: u64) -> f64 {
    if g + c == 0 {
        0.0
    } else {
        (g as f64 - c as f64) / (g + c) as f64
    }
}

/// Skew values for one task
///
/// A value is closed after every `step_size`-th byte. If no window closes
/// the result is `[0.0]`, so the output is never empty.
pub fn compute_windows(bytes: &[u8], params: WindowParams, policy: CasePolicy) -> Vec<f64> {
    let table = policy.table();
    let step = params.step_size;
    let mut values = Vec::with_capacity(bytes.len() / step + 1);

    for chunk in bytes.chunks_exact(step) {
        let (mut g, mut c) = (0u64, 0u64);
        for &byte in chunk {
            match table[byte as usize] {
                BaseClass::G => g += 1,
                BaseClass::C => c += 1,
                _ => {}
            }
        }
        values.push(skew(g, c));
    }

    if values.is_empty() {
        values.push(0.0);
    }
    values
}

// Compact once the consumed prefix exceeds this many bytes
const COMPACT_THRESHOLD: usize = 64 * 1024;

/// Bytes of the current accession that have not been windowed yet
///
/// After every emitted window `step_size` bytes are consumed. If fewer than
/// `step_size` bytes are buffered, the shortfall is skipped from the next
/// input pushed.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    params: WindowParams,
    data: Vec<u8>,
    head: usize,
    skip: usize,
}

impl RollingBuffer {
    pub fn new(params: WindowParams) -> Self {
        Self {
            params,
            data: Vec::new(),
            head: 0,
            skip: 0,
        }
    }

    /// Buffered bytes not yet consumed
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append payload bytes
    pub fn push(&mut self, mut bytes: &[u8]) {
        if self.skip > 0 {
            let skipped = self.skip.min(bytes.len());
            bytes = &bytes[skipped..];
            self.skip -= skipped;
        }
        self.data.extend_from_slice(bytes);
    }

    /// Next full window, if enough bytes are buffered
    pub fn next_window(&mut self) -> Option<Vec<u8>> {
        let window_size = self.params.window_size;
        if self.len() < window_size {
            return None;
        }

        let window = self.data[self.head..self.head + window_size].to_vec();
        self.consume(self.params.step_size);
        Some(window)
    }

    /// Take whatever is left as a final partial window and reset
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        let rest = (!self.is_empty()).then(|| self.data[self.head..].to_vec());
        self.data.clear();
        self.head = 0;
        self.skip = 0;
        rest
    }

    fn consume(&mut self, step: usize) {
        let available = self.len();
        if step >= available {
            self.data.clear();
            self.head = 0;
            self.skip += step - available;
            return;
        }

        self.head += step;
        if self.head >= COMPACT_THRESHOLD && self.head * 2 >= self.data.len() {
            self.data.drain(..self.head);
            self.head = 0;
        }
    }
}

/// One unit of skew work
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTask {
    pub accession: Arc<str>,
    pub bytes: Vec<u8>,
}

/// Cuts a FASTA stream into [`WindowTask`]s in traversal order
///
/// Each header flushes the previous accession's remainder as a final
/// partial task, as does end of stream. Accessions without payload produce
/// no tasks.
///
/// Windows are cut one per call to `next`, so a consumer that stops pulling
/// (a full work queue) also stops the copying. At most one flushed
/// remainder is held besides the rolling buffer.
pub struct WindowTasks<R> {
    scanner: FastaScanner<R>,
    buffer: RollingBuffer,
    accession: Arc<str>,
    flushed: Option<WindowTask>,
    done: bool,
}

impl<R: Read> WindowTasks<R> {
    pub fn new(reader: R, params: WindowParams) -> Self {
        Self::with_buffer_size(reader, params, DEFAULT_READ_BUFFER_SIZE)
    }

    pub fn with_buffer_size(reader: R, params: WindowParams, buffer_size: usize) -> Self {
        Self {
            scanner: FastaScanner::with_buffer_size(reader, buffer_size),
            buffer: RollingBuffer::new(params),
            accession: Arc::from(""),
            flushed: None,
            done: false,
        }
    }

    fn task(&self, bytes: Vec<u8>) -> WindowTask {
        WindowTask {
            accession: Arc::clone(&self.accession),
            bytes,
        }
    }

    fn flush(&mut self) {
        self.flushed = self.buffer.flush().map(|bytes| self.task(bytes));
    }
}

impl<R: Read> Iterator for WindowTasks<R> {
    type Item = EngineResult<WindowTask>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(task) = self.flushed.take() {
                return Some(Ok(task));
            }
            // full windows are drained before the next event, so a header
            // never arrives while one is still buffered
            if let Some(window) = self.buffer.next_window() {
                return Some(Ok(self.task(window)));
            }
            if self.done {
                return None;
            }

            match self.scanner.next_event() {
                Err(err) => {
                    self.done = true;
                    self.buffer.flush();
                    return Some(Err(err));
                }
                Ok(None) => {
                    self.done = true;
                    self.flush();
                }
                Ok(Some(ScanEvent::Header { accession, .. })) => {
                    self.flush();
                    self.accession = Arc::from(accession);
                }
                Ok(Some(ScanEvent::Payload(bytes))) => self.buffer.push(&bytes),
            }
        }
    }
}

/// Skew values keyed by accession
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GcSkewSeries {
    series: HashMap<String, Vec<f64>>,
}

impl GcSkewSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values to an accession's series
    pub fn append(&mut self, accession: &str, values: Vec<f64>) {
        match self.series.get_mut(accession) {
            Some(existing) => existing.extend(values),
            None => {
                self.series.insert(accession.to_string(), values);
            }
        }
    }

    pub fn get(&self, accession: &str) -> Option<&[f64]> {
        self.series.get(accession).map(Vec::as_slice)
    }

    /// Number of accessions
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Accessions in lexicographic order
    pub fn accessions(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).sorted().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn into_inner(self) -> HashMap<String, Vec<f64>> {
        self.series
    }
}

/// Compute the skew series of a whole stream on the calling thread
pub fn compute_gc_skew_sequential<R: Read>(
    reader: R,
    params: WindowParams,
    policy: CasePolicy,
    buffer_size: usize,
) -> EngineResult<GcSkewSeries> {
    let mut series = GcSkewSeries::new();
    for task in WindowTasks::with_buffer_size(reader, params, buffer_size) {
        let task = task?;
        series.append(&task.accession, compute_windows(&task.bytes, params, policy));
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(window_size: usize, step_size: usize) -> WindowParams {
        WindowParams::new(window_size, step_size).unwrap()
    }

    fn tasks(input: &[u8], p: WindowParams, buffer_size: usize) -> Vec<(String, Vec<u8>)> {
        WindowTasks::with_buffer_size(input, p, buffer_size)
            .map(|t| t.map(|t| (t.accession.to_string(), t.bytes)))
            .collect::<EngineResult<_>>()
            .unwrap()
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(
            WindowParams::new(0, 1),
            Err(EngineError::InvalidParameter { name: "window_size", .. })
        ));
        assert!(matches!(
            WindowParams::new(1, 0),
            Err(EngineError::InvalidParameter { name: "step_size", .. })
        ));
    }

    #[test]
    fn test_skew_formula() {
        let values = compute_windows(b"GGGC", params(4, 4), CasePolicy::Insensitive);
        assert_eq!(values, vec![0.5]);

        let values = compute_windows(b"AATT", params(4, 4), CasePolicy::Insensitive);
        assert_eq!(values, vec![0.0]);
    }

    #[test]
    fn test_windows_close_on_step_cadence() {
        // trailing "G" never closes a window
        let values = compute_windows(b"GGCCCCGGG", params(4, 2), CasePolicy::Insensitive);
        assert_eq!(values, vec![1.0, -1.0, -1.0, 1.0]);
    }

    #[test]
    fn test_short_input_yields_single_zero() {
        let values = compute_windows(b"GGG", params(10, 5), CasePolicy::Insensitive);
        assert_eq!(values, vec![0.0]);
        assert_eq!(compute_windows(b"", params(1, 1), CasePolicy::Insensitive), vec![0.0]);
    }

    #[test]
    fn test_case_policy_applies_to_skew() {
        let insensitive = compute_windows(b"ggGc", params(4, 4), CasePolicy::Insensitive);
        assert_eq!(insensitive, vec![0.5]);

        let upper = compute_windows(b"ggGc", params(4, 4), CasePolicy::UppercaseOnly);
        assert_eq!(upper, vec![1.0]);
    }

    #[test]
    fn test_rolling_buffer_overlapping_windows() {
        let mut buffer = RollingBuffer::new(params(4, 2));
        buffer.push(b"AAAAGG");
        assert_eq!(buffer.next_window().as_deref(), Some(&b"AAAA"[..]));
        assert_eq!(buffer.next_window().as_deref(), Some(&b"AAGG"[..]));
        assert_eq!(buffer.next_window(), None);
        assert_eq!(buffer.flush().as_deref(), Some(&b"GG"[..]));
        assert!(buffer.is_empty());
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn test_rolling_buffer_skips_past_short_buffer() {
        let mut buffer = RollingBuffer::new(params(2, 5));
        buffer.push(b"ACG");
        assert_eq!(buffer.next_window().as_deref(), Some(&b"AC"[..]));
        assert!(buffer.is_empty());

        // two bytes of the step are still owed
        buffer.push(b"TTCC");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.next_window().as_deref(), Some(&b"CC"[..]));
    }

    #[test]
    fn test_rolling_buffer_compacts() {
        let mut buffer = RollingBuffer::new(params(1, 1));
        buffer.push(&vec![b'A'; 3 * COMPACT_THRESHOLD]);
        let mut emitted = 0;
        while buffer.next_window().is_some() {
            emitted += 1;
        }
        assert_eq!(emitted, 3 * COMPACT_THRESHOLD);
        assert!(buffer.data.len() < 3 * COMPACT_THRESHOLD);
    }

    #[test]
    fn test_tasks_flush_on_header_and_end() {
        let input = b">a first\nGGGG\nCC\n>b\nGC\n";
        for buffer_size in [1, 2, 5, 64] {
            assert_eq!(
                tasks(input, params(4, 4), buffer_size),
                vec![
                    ("a".to_string(), b"GGGG".to_vec()),
                    ("a".to_string(), b"CC".to_vec()),
                    ("b".to_string(), b"GC".to_vec()),
                ],
                "buffer size {}",
                buffer_size
            );
        }
    }

    #[test]
    fn test_tasks_are_cut_lazily() {
        let mut input = b">r\n".to_vec();
        input.extend(std::iter::repeat(b'G').take(32_772));
        let mut tasks = WindowTasks::with_buffer_size(&input[..], params(1024, 1), 1 << 20);

        let first = tasks.next().unwrap().unwrap();
        assert_eq!(first.bytes.len(), 1024);
        // only the unwindowed payload is held, never a backlog of cut windows
        assert!(tasks.flushed.is_none());
        assert!(tasks.buffer.len() <= 32_772);

        // 32_772 - 1024 + 1 full windows, then the 1023-byte remainder
        let rest: Vec<_> = tasks.collect::<EngineResult<_>>().unwrap();
        assert_eq!(rest.len() + 1, 31_750);
        assert_eq!(rest.last().map(|t| t.bytes.len()), Some(1023));
    }

    #[test]
    fn test_accession_without_payload_has_no_tasks() {
        assert!(tasks(b">empty\n>also empty\n", params(2, 2), 8).is_empty());
    }

    #[test]
    fn test_sequential_series() {
        let input = b">a\nGGGG\nCC\n>b\nGC\n";
        let series =
            compute_gc_skew_sequential(&input[..], params(4, 4), CasePolicy::Insensitive, 3)
                .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.get("a"), Some(&[1.0, 0.0][..]));
        assert_eq!(series.get("b"), Some(&[0.0][..]));
        assert_eq!(series.accessions(), vec!["a", "b"]);
    }

    #[test]
    fn test_series_serializes_as_map() {
        let mut series = GcSkewSeries::new();
        series.append("chr1", vec![0.5]);
        series.append("chr1", vec![-0.25]);

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"chr1":[0.5,-0.25]}"#);
    }

    proptest! {
        #[test]
        fn prop_windows_never_empty(
            bytes in proptest::collection::vec(any::<u8>(), 0..256),
            window_size in 1usize..64,
            step_size in 1usize..64,
        ) {
            let values = compute_windows(&bytes, params(window_size, step_size), CasePolicy::Insensitive);
            prop_assert!(!values.is_empty());
            prop_assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }
}
