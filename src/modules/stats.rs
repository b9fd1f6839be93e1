//! Whole-stream sequence statistics
//!
//! Every streaming operation follows the same shape: the FASTA source is
//! tokenized on the calling thread, payload work is fanned out to the
//! pipeline workers, and a single aggregator folds the results.

use std::io::Read;
use std::iter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::engines::compute::counting::{BaseCounter, BaseCounts};
use crate::engines::compute::skew::{compute_windows, GcSkewSeries, WindowParams, WindowTask, WindowTasks};
use crate::engines::core::memory::MemoryMapped;
use crate::engines::core::parallel::global_pool;
use crate::engines::core::{CancellationToken, Pipeline};
use crate::engines::storage::formats::{FastaScanner, ScanEvent, SequenceRecord};
use crate::engines::EngineResult;
use crate::modules::config::AnalysisConfig;

/// Payload fragments of a FASTA stream, headers dropped
fn payload_chunks<R: Read>(reader: R, buffer_size: usize) -> impl Iterator<Item = EngineResult<Vec<u8>>> {
    let mut scanner = FastaScanner::with_buffer_size(reader, buffer_size);
    iter::from_fn(move || loop {
        match scanner.next_event() {
            Ok(Some(ScanEvent::Payload(bytes))) => return Some(Ok(bytes)),
            Ok(Some(ScanEvent::Header { .. })) => continue,
            Ok(None) => return None,
            Err(err) => return Some(Err(err)),
        }
    })
}

/// Count A/C/G/T over every record of a FASTA stream
pub fn count_bases<R: Read>(reader: R) -> EngineResult<BaseCounts> {
    count_bases_with(reader, &AnalysisConfig::default(), &CancellationToken::new())
}

/// [`count_bases`] with explicit configuration and cancellation
pub fn count_bases_with<R: Read>(
    reader: R,
    config: &AnalysisConfig,
    token: &CancellationToken,
) -> EngineResult<BaseCounts> {
    config.validate()?;
    let pipeline = Pipeline::new(config.pipeline_config(), token)?;
    let counter = BaseCounter::new(config.case_policy);
    let start = Instant::now();

    let counts = pipeline.run(
        payload_chunks(reader, config.buffer_size),
        |bytes: Vec<u8>| Ok(counter.count(&bytes)),
        BaseCounts::default(),
        |total: &mut BaseCounts, counts: BaseCounts| *total += counts,
    )?;

    log::info!(
        "counted {} bases in {:.2?}",
        counts.total(),
        start.elapsed()
    );
    Ok(counts)
}

/// GC content of a FASTA stream as a percentage rounded to `precision` decimals
pub fn gc_content<R: Read>(reader: R, precision: u32) -> EngineResult<f64> {
    Ok(count_bases(reader)?.gc_percent(precision))
}

/// Count A/C/G/T in a FASTA file through a read-only memory map
pub fn count_bases_path<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> EngineResult<BaseCounts> {
    let mapped = MemoryMapped::open(path.as_ref())?;
    log::debug!("mapped {} ({} bytes)", path.as_ref().display(), mapped.len());
    count_bases_with(mapped.as_slice(), config, &CancellationToken::new())
}

/// Count A/C/G/T over already materialized records on the global rayon pool
pub fn count_records(records: &[SequenceRecord]) -> BaseCounts {
    let counter = BaseCounter::default();
    match global_pool() {
        Some(pool) => pool.install(|| {
            records
                .par_iter()
                .map(|record| counter.count(&record.payload))
                .reduce(BaseCounts::default, |a, b| a + b)
        }),
        None => records.iter().map(|record| counter.count(&record.payload)).sum(),
    }
}

/// GC skew per window, keyed by accession
pub fn compute_gc_skew<R: Read>(reader: R, window_size: usize, step_size: usize) -> EngineResult<GcSkewSeries> {
    compute_gc_skew_with(
        reader,
        window_size,
        step_size,
        &AnalysisConfig::default(),
        &CancellationToken::new(),
    )
}

/// [`compute_gc_skew`] with explicit configuration and cancellation
pub fn compute_gc_skew_with<R: Read>(
    reader: R,
    window_size: usize,
    step_size: usize,
    config: &AnalysisConfig,
    token: &CancellationToken,
) -> EngineResult<GcSkewSeries> {
    let params = WindowParams::new(window_size, step_size)?;
    config.validate()?;
    let pipeline = Pipeline::new(config.pipeline_config(), token)?;
    let policy = config.case_policy;
    let start = Instant::now();

    let series = pipeline.run(
        WindowTasks::with_buffer_size(reader, params, config.buffer_size),
        |task: WindowTask| Ok((task.accession, compute_windows(&task.bytes, params, policy))),
        GcSkewSeries::new(),
        |series: &mut GcSkewSeries, (accession, values): (Arc<str>, Vec<f64>)| {
            series.append(&accession, values)
        },
    )?;

    log::info!(
        "computed GC skew for {} accessions in {:.2?}",
        series.len(),
        start.elapsed()
    );
    Ok(series)
}
