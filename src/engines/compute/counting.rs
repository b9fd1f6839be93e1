//! Nucleotide counting
//!
//! Counting is a single pass over the payload bytes through a 256-entry
//! classification table. Counts over disjoint chunks add up to the count
//! over the whole input, which is what lets the pipeline and the rayon
//! path split work freely.

use std::io::Read;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engines::core::lookup::{BaseClass, CasePolicy};
use crate::engines::core::parallel::{chunk_slice, global_pool};
use crate::engines::storage::formats::{FastaScanner, ScanEvent};
use crate::engines::EngineResult;

// Payloads shorter than this are counted on the calling thread
const PARALLEL_THRESHOLD: usize = 1 << 20;

/// Tally of the four canonical nucleotides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseCounts {
    pub a: u64,
    pub c: u64,
    pub g: u64,
    pub t: u64,
}

impl BaseCounts {
    /// Sum of all four tallies
    pub fn total(&self) -> u64 {
        self.a + self.c + self.g + self.t
    }

    /// Number of G and C bases
    pub fn gc_count(&self) -> u64 {
        self.g + self.c
    }

    /// GC fraction in `[0, 1]`, `0.0` if nothing was counted
    pub fn gc_content(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.gc_count() as f64 / total as f64
    }

    /// GC percentage rounded to `precision` decimal places
    pub fn gc_percent(&self, precision: u32) -> f64 {
        let scale = 10f64.powi(precision as i32);
        (self.gc_content() * 100.0 * scale).round() / scale
    }
}

impl Add for BaseCounts {
    type Output = BaseCounts;

    fn add(self, rhs: BaseCounts) -> BaseCounts {
        BaseCounts {
            a: self.a + rhs.a,
            c: self.c + rhs.c,
            g: self.g + rhs.g,
            t: self.t + rhs.t,
        }
    }
}

impl AddAssign for BaseCounts {
    fn add_assign(&mut self, rhs: BaseCounts) {
        *self = *self + rhs;
    }
}

impl Sum for BaseCounts {
    fn sum<I: Iterator<Item = BaseCounts>>(iter: I) -> Self {
        iter.fold(BaseCounts::default(), Add::add)
    }
}

impl<'a> Sum<&'a BaseCounts> for BaseCounts {
    fn sum<I: Iterator<Item = &'a BaseCounts>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Table-driven base counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseCounter {
    policy: CasePolicy,
}

impl BaseCounter {
    pub fn new(policy: CasePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CasePolicy {
        self.policy
    }

    /// Count bases in a raw payload; every other byte is ignored
    pub fn count(&self, bytes: &[u8]) -> BaseCounts {
        let table = self.policy.table();
        let mut tallies = [0u64; 5];
        for &byte in bytes {
            tallies[table[byte as usize].index()] += 1;
        }

        BaseCounts {
            a: tallies[BaseClass::A.index()],
            c: tallies[BaseClass::C.index()],
            g: tallies[BaseClass::G.index()],
            t: tallies[BaseClass::T.index()],
        }
    }

    /// Count a large in-memory payload on the global rayon pool
    ///
    /// Runs on the calling thread if no pool could be built.
    pub fn count_parallel(&self, bytes: &[u8]) -> BaseCounts {
        if bytes.len() < PARALLEL_THRESHOLD {
            return self.count(bytes);
        }

        let Some(pool) = global_pool() else {
            return self.count(bytes);
        };
        pool.install(|| {
            chunk_slice(bytes, None)
                .par_iter()
                .map(|chunk| self.count(chunk))
                .reduce(BaseCounts::default, Add::add)
        })
    }

    /// Count the payload of every record in a FASTA stream, on this thread
    ///
    /// Header lines are never counted.
    pub fn count_reader<R: Read>(&self, reader: R, buffer_size: usize) -> EngineResult<BaseCounts> {
        let mut scanner = FastaScanner::with_buffer_size(reader, buffer_size);
        let mut counts = BaseCounts::default();
        while let Some(event) = scanner.next_event()? {
            if let ScanEvent::Payload(bytes) = event {
                counts += self.count(&bytes);
            }
        }
        Ok(counts)
    }
}

/// Count bases with the default case-insensitive policy
pub fn count(bytes: &[u8]) -> BaseCounts {
    BaseCounter::default().count(bytes)
}
