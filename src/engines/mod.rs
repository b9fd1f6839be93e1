//! Engines for streaming sequence analysis
//!
//! The engines layer holds the building blocks: the FASTA tokenizer
//! (`storage`), the counting, windowing and alignment kernels (`compute`)
//! and the thread/queue machinery that runs them in parallel (`core`).

pub mod core;
pub mod compute;
pub mod storage;

mod error;

pub use error::{EngineError, EngineResult};
