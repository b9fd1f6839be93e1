//! Pairwise alignment entry point

use crate::engines::compute::alignment::{Aligner, AlignmentResult, NeedlemanWunsch, ScoringScheme};

/// Globally align two sequences with the given scores
///
/// Empty inputs are a valid degenerate case: two empty sequences align to
/// two empty strings with score 0.
pub fn align(
    seq1: &str,
    seq2: &str,
    match_score: i32,
    mismatch_score: i32,
    gap_penalty: i32,
) -> AlignmentResult {
    NeedlemanWunsch::new(ScoringScheme::new(match_score, mismatch_score, gap_penalty)).align(seq1, seq2)
}
