//! Storage and data format handling
//!
//! FASTA input is tokenized here; everything downstream works on
//! [`SequenceRecord`]s or raw payload bytes.

pub mod formats;

pub use formats::{FastaScanner, FastaTokenizer, ScanEvent, ScanState, SequenceRecord};
