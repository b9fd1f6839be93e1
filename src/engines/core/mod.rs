//! Core runtime primitives
//!
//! Byte sources, memory mapping, classification tables and the
//! producer/worker/aggregator pipeline shared by the compute engines.

pub mod io;
pub mod lookup;
pub mod memory;
pub mod parallel;
pub mod pipeline;

pub use lookup::{BaseClass, CasePolicy};
pub use parallel::CancellationToken;
pub use pipeline::{Pipeline, PipelineConfig};
