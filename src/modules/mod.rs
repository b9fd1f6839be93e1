//! Caller-facing operations
//!
//! Thin functions over the engines: they validate parameters, wire a byte
//! source into the tokenizer and pipeline, and return aggregated results.

pub mod align;
pub mod config;
pub mod io;
pub mod stats;

pub use align::align;
pub use config::AnalysisConfig;
pub use io::{read_fasta, read_fasta_from, write_fasta};
pub use stats::{
    compute_gc_skew, compute_gc_skew_with, count_bases, count_bases_path, count_bases_with,
    count_records, gc_content,
};
