//! Record-level FASTA I/O

pub mod fasta;

pub use fasta::{read_fasta, read_fasta_from, write_fasta};
