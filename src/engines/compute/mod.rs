//! Compute engines
//!
//! Pure functions over payload bytes and sequences: base counting, windowed
//! GC skew and global alignment. None of them touch threads directly; the
//! pipeline and the rayon pool decide where they run.

pub mod alignment;
pub mod counting;
pub mod skew;

pub use alignment::{Aligner, AlignmentResult, NeedlemanWunsch, ScoringScheme};
pub use counting::{BaseCounter, BaseCounts};
pub use skew::{compute_windows, GcSkewSeries, RollingBuffer, WindowParams, WindowTask, WindowTasks};
