//! Byte classification tables
//!
//! Each table maps every possible byte value to a [`BaseClass`]. The tables
//! are built at compile time and shared read-only by every thread.

use serde::{Deserialize, Serialize};

/// Nucleotide class of a single byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BaseClass {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
    /// Anything that is not one of the four bases (N, IUPAC codes, gaps...)
    Other = 4,
}

impl BaseClass {
    /// Index into a five-slot tally array
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Which letter cases count as bases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePolicy {
    /// `acgt` and `ACGT` are both counted
    #[default]
    Insensitive,
    /// Only `ACGT` is counted; lowercase (soft-masked) bases are ignored
    UppercaseOnly,
}

impl CasePolicy {
    /// Classification table for this policy
    #[inline]
    pub fn table(self) -> &'static [BaseClass; 256] {
        match self {
            CasePolicy::Insensitive => &INSENSITIVE_TABLE,
            CasePolicy::UppercaseOnly => &UPPERCASE_TABLE,
        }
    }

    /// Classify a single byte
    #[inline]
    pub fn classify(self, byte: u8) -> BaseClass {
        self.table()[byte as usize]
    }
}

const fn build_table(lowercase: bool) -> [BaseClass; 256] {
    let mut table = [BaseClass::Other; 256];
    table[b'A' as usize] = BaseClass::A;
    table[b'C' as usize] = BaseClass::C;
    table[b'G' as usize] = BaseClass::G;
    table[b'T' as usize] = BaseClass::T;
    if lowercase {
        table[b'a' as usize] = BaseClass::A;
        table[b'c' as usize] = BaseClass::C;
        table[b'g' as usize] = BaseClass::G;
        table[b't' as usize] = BaseClass::T;
    }
    table
}

static INSENSITIVE_TABLE: [BaseClass; 256] = build_table(true);
static UPPERCASE_TABLE: [BaseClass; 256] = build_table(false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insensitive_table() {
        let policy = CasePolicy::Insensitive;
        assert_eq!(policy.classify(b'A'), BaseClass::A);
        assert_eq!(policy.classify(b'a'), BaseClass::A);
        assert_eq!(policy.classify(b'g'), BaseClass::G);
        assert_eq!(policy.classify(b'N'), BaseClass::Other);
        assert_eq!(policy.classify(b'>'), BaseClass::Other);
        assert_eq!(policy.classify(b'U'), BaseClass::Other);
    }

    #[test]
    fn test_uppercase_table() {
        let policy = CasePolicy::UppercaseOnly;
        assert_eq!(policy.classify(b'T'), BaseClass::T);
        assert_eq!(policy.classify(b't'), BaseClass::Other);
        assert_eq!(policy.classify(b'c'), BaseClass::Other);
    }

    #[test]
    fn test_only_eight_bytes_are_bases() {
        let bases = (0..=255u8)
            .filter(|&b| CasePolicy::Insensitive.classify(b) != BaseClass::Other)
            .count();
        assert_eq!(bases, 8);

        let bases = (0..=255u8)
            .filter(|&b| CasePolicy::UppercaseOnly.classify(b) != BaseClass::Other)
            .count();
        assert_eq!(bases, 4);
    }
}
