//! Global sequence alignment
//!
//! Needleman-Wunsch with a linear gap penalty. The traceback re-derives each
//! step from the filled matrix using the same scoring scheme as the fill,
//! preferring diagonal, then up, then left.

use std::cmp;
use std::fmt;

use serde::{Deserialize, Serialize};

const GAP: char = '-';
const LINE_WIDTH: usize = 60;

/// Scores used to fill the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringScheme {
    /// Score for a match
    pub match_score: i32,
    /// Score for a mismatch
    pub mismatch_score: i32,
    /// Score added for every gap column
    pub gap_penalty: i32,
}

impl ScoringScheme {
    pub fn new(match_score: i32, mismatch_score: i32, gap_penalty: i32) -> Self {
        Self {
            match_score,
            mismatch_score,
            gap_penalty,
        }
    }

    #[inline]
    fn substitution(&self, a: char, b: char) -> i64 {
        i64::from(if a == b {
            self.match_score
        } else {
            self.mismatch_score
        })
    }
}

impl Default for ScoringScheme {
    fn default() -> Self {
        Self::new(2, -1, -2)
    }
}

/// `(rows × cols)` score matrix stored row-major, 64-bit cells
struct ScoreMatrix {
    cols: usize,
    cells: Vec<i64>,
}

impl ScoreMatrix {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            cells: vec![0; rows * cols],
        }
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> i64 {
        self.cells[i * self.cols + j]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, score: i64) {
        self.cells[i * self.cols + j] = score;
    }
}

/// A pairwise global alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// First sequence with gaps inserted
    pub aligned_seq1: String,
    /// Second sequence with gaps inserted
    pub aligned_seq2: String,
    /// Score of the alignment, widened so long sequences cannot overflow
    pub score: i64,
}

impl AlignmentResult {
    /// Percentage of columns where both sequences carry the same non-gap symbol
    pub fn identity(&self) -> f64 {
        let (matches, columns) = self
            .aligned_seq1
            .chars()
            .zip(self.aligned_seq2.chars())
            .fold((0usize, 0usize), |(matches, columns), (a, b)| {
                (matches + usize::from(a == b && a != GAP), columns + 1)
            });

        if columns == 0 {
            0.0
        } else {
            matches as f64 / columns as f64 * 100.0
        }
    }
}

impl fmt::Display for AlignmentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score: {}", self.score)?;
        writeln!(f, "Identity: {:.2}%", self.identity())?;

        let seq1: Vec<char> = self.aligned_seq1.chars().collect();
        let seq2: Vec<char> = self.aligned_seq2.chars().collect();
        let total_len = cmp::min(seq1.len(), seq2.len());

        for start in (0..total_len).step_by(LINE_WIDTH) {
            let end = cmp::min(start + LINE_WIDTH, total_len);
            let top: String = seq1[start..end].iter().collect();
            let bottom: String = seq2[start..end].iter().collect();
            let bars: String = seq1[start..end]
                .iter()
                .zip(&seq2[start..end])
                .map(|(a, b)| if a == b && *a != GAP { '|' } else { ' ' })
                .collect();

            writeln!(f)?;
            writeln!(f, "Seq1: {}", top)?;
            writeln!(f, "      {}", bars)?;
            writeln!(f, "Seq2: {}", bottom)?;
        }
        Ok(())
    }
}

/// Pairwise aligners
pub trait Aligner {
    fn align(&self, seq1: &str, seq2: &str) -> AlignmentResult;
}

/// Global alignment with a linear gap penalty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeedlemanWunsch {
    scoring: ScoringScheme,
}

impl NeedlemanWunsch {
    pub fn new(scoring: ScoringScheme) -> Self {
        Self { scoring }
    }

    pub fn scoring(&self) -> &ScoringScheme {
        &self.scoring
    }

    fn fill(&self, seq1: &[char], seq2: &[char]) -> ScoreMatrix {
        let (m, n) = (seq1.len(), seq2.len());
        let gap = i64::from(self.scoring.gap_penalty);
        let mut matrix = ScoreMatrix::new(m + 1, n + 1);

        for i in 1..=m {
            matrix.set(i, 0, matrix.get(i - 1, 0) + gap);
        }
        for j in 1..=n {
            matrix.set(0, j, matrix.get(0, j - 1) + gap);
        }

        for i in 1..=m {
            for j in 1..=n {
                let diagonal = matrix.get(i - 1, j - 1) + self.scoring.substitution(seq1[i - 1], seq2[j - 1]);
                let up = matrix.get(i - 1, j) + gap;
                let left = matrix.get(i, j - 1) + gap;
                matrix.set(i, j, diagonal.max(up).max(left));
            }
        }
        matrix
    }

    fn traceback(&self, matrix: &ScoreMatrix, seq1: &[char], seq2: &[char]) -> (String, String) {
        let gap = i64::from(self.scoring.gap_penalty);
        let mut aligned1 = Vec::with_capacity(seq1.len() + seq2.len());
        let mut aligned2 = Vec::with_capacity(seq1.len() + seq2.len());
        let (mut i, mut j) = (seq1.len(), seq2.len());

        while i > 0 || j > 0 {
            let current = matrix.get(i, j);
            if i > 0
                && j > 0
                && current == matrix.get(i - 1, j - 1) + self.scoring.substitution(seq1[i - 1], seq2[j - 1])
            {
                aligned1.push(seq1[i - 1]);
                aligned2.push(seq2[j - 1]);
                i -= 1;
                j -= 1;
            } else if i > 0 && current == matrix.get(i - 1, j) + gap {
                aligned1.push(seq1[i - 1]);
                aligned2.push(GAP);
                i -= 1;
            } else {
                // row 0 and every cell not reached diagonally or from above
                aligned1.push(GAP);
                aligned2.push(seq2[j - 1]);
                j -= 1;
            }
        }

        (aligned1.into_iter().rev().collect(), aligned2.into_iter().rev().collect())
    }
}

impl Aligner for NeedlemanWunsch {
    fn align(&self, seq1: &str, seq2: &str) -> AlignmentResult {
        let seq1: Vec<char> = seq1.chars().collect();
        let seq2: Vec<char> = seq2.chars().collect();

        let matrix = self.fill(&seq1, &seq2);
        let (aligned_seq1, aligned_seq2) = self.traceback(&matrix, &seq1, &seq2);

        AlignmentResult {
            aligned_seq1,
            aligned_seq2,
            score: matrix.get(seq1.len(), seq2.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nw(match_score: i32, mismatch_score: i32, gap_penalty: i32) -> NeedlemanWunsch {
        NeedlemanWunsch::new(ScoringScheme::new(match_score, mismatch_score, gap_penalty))
    }

    #[test]
    fn test_global_alignment() {
        let alignment = NeedlemanWunsch::default().align("ACGTACGT", "ACGTCGT");

        // 7 matches * 2 + 1 gap * -2
        assert_eq!(alignment.score, 12);
        assert_eq!(alignment.aligned_seq1, "ACGTACGT");
        assert_eq!(alignment.aligned_seq2.len(), 8);
        assert_eq!(alignment.aligned_seq2.replace('-', ""), "ACGTCGT");
        assert_eq!(alignment.aligned_seq2.matches('-').count(), 1);
    }

    #[test]
    fn test_self_alignment() {
        let seq = "GATTACA";
        let alignment = NeedlemanWunsch::default().align(seq, seq);
        assert_eq!(alignment.aligned_seq1, seq);
        assert_eq!(alignment.aligned_seq2, seq);
        assert_eq!(alignment.score, 14);
        assert_eq!(alignment.identity(), 100.0);
    }

    #[test]
    fn test_classic_example_with_unit_scores() {
        let alignment = nw(1, -1, -1).align("GATTACA", "GCATGCU");
        assert_eq!(alignment.score, 0);
        assert_eq!(alignment.aligned_seq1.len(), alignment.aligned_seq2.len());
        assert_eq!(alignment.aligned_seq1.replace('-', ""), "GATTACA");
        assert_eq!(alignment.aligned_seq2.replace('-', ""), "GCATGCU");
    }

    #[test]
    fn test_traceback_uses_configured_scores() {
        // with a match score of 5 the traceback must still recover the fill path
        let alignment = nw(5, -3, -4).align("AAGT", "AGT");
        assert_eq!(alignment.aligned_seq2.replace('-', ""), "AGT");
        assert_eq!(alignment.score, 3 * 5 - 4);
    }

    #[test]
    fn test_empty_inputs() {
        let alignment = NeedlemanWunsch::default().align("", "");
        assert_eq!(alignment.aligned_seq1, "");
        assert_eq!(alignment.aligned_seq2, "");
        assert_eq!(alignment.score, 0);
        assert_eq!(alignment.identity(), 0.0);

        let alignment = NeedlemanWunsch::default().align("ACG", "");
        assert_eq!(alignment.aligned_seq1, "ACG");
        assert_eq!(alignment.aligned_seq2, "---");
        assert_eq!(alignment.score, -6);

        let alignment = NeedlemanWunsch::default().align("", "TT");
        assert_eq!(alignment.aligned_seq1, "--");
        assert_eq!(alignment.aligned_seq2, "TT");
        assert_eq!(alignment.score, -4);
    }

    #[test]
    fn test_extreme_penalties_do_not_overflow() {
        let alignment = nw(1, -1, -1_500_000_000).align("AA", "");
        assert_eq!(alignment.score, -3_000_000_000);
        assert_eq!(alignment.aligned_seq2, "--");

        let seq1 = "ACGT".repeat(750);
        let seq2 = "TGCA".repeat(700);
        let alignment = nw(i32::MAX, i32::MIN, -1_000_000).align(&seq1, &seq2);
        assert_eq!(alignment.aligned_seq1.replace('-', ""), seq1);
        assert_eq!(alignment.aligned_seq2.replace('-', ""), seq2);
        assert_eq!(alignment.aligned_seq1.len(), alignment.aligned_seq2.len());
    }

    #[test]
    fn test_display_wraps_long_alignments() {
        let seq = "ACGT".repeat(20);
        let rendered = NeedlemanWunsch::default().align(&seq, &seq).to_string();

        assert!(rendered.starts_with("Score: 160\nIdentity: 100.00%\n"));
        assert_eq!(rendered.matches("Seq1: ").count(), 2);
        assert!(rendered.contains(&"|".repeat(60)));
    }
}
