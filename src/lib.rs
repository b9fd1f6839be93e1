//! FASTA statistics: base counts, GC content, windowed GC skew and
//! Needleman-Wunsch global alignment.
//!
//! The crate is split in two layers. [`engines`] holds the streaming
//! tokenizer, the compute kernels and the bounded worker pipeline;
//! [`modules`] exposes the operations callers use directly.
//!
//! ```no_run
//! use genostat::{compute_gc_skew, count_bases};
//! use std::fs::File;
//!
//! let counts = count_bases(File::open("genome.fasta")?)?;
//! println!("GC: {:.1}%", counts.gc_percent(1));
//!
//! let skew = compute_gc_skew(File::open("genome.fasta")?, 1000, 1000)?;
//! for accession in skew.accessions() {
//!     println!("{}: {} windows", accession, skew.get(accession).map_or(0, |s| s.len()));
//! }
//! # Ok::<(), genostat::EngineError>(())
//! ```

pub mod engines;
pub mod modules;

pub use engines::compute::{AlignmentResult, BaseCounts, GcSkewSeries, ScoringScheme};
pub use engines::core::{CancellationToken, CasePolicy};
pub use engines::storage::SequenceRecord;
pub use engines::{EngineError, EngineResult};
pub use modules::{
    align, compute_gc_skew, compute_gc_skew_with, count_bases, count_bases_path, count_bases_with,
    count_records, gc_content, read_fasta, read_fasta_from, write_fasta, AnalysisConfig,
};
