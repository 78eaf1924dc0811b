//! Token-level edit-distance alignment
//!
//! Builds the unit-cost Levenshtein table between a reference and a hypothesis
//! sequence and backtracks it into an aligned pair with explicit gap slots.
//! At cells with several optimal predecessors the backtrace prefers a deletion,
//! then an insertion, then a substitution. Every downstream statistic depends on
//! that order, so it is pinned by the tests below.

use std::fmt;

use serde::Serialize;

use crate::aggregate::ErrorEvent;

/// Text printed in place of a gap slot
pub const GAP_MARKER: &str = "<epsilon>";

/// One position of an aligned sequence: a real token or a gap
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot<T> {
    Token(T),
    Gap,
}

impl<T> Slot<T> {
    /// The token held by this slot, `None` for a gap
    pub fn token(&self) -> Option<&T> {
        match self {
            Self::Token(token) => Some(token),
            Self::Gap => None,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Self::Gap)
    }
}

impl<T: fmt::Display> fmt::Display for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => fmt::Display::fmt(token, f),
            Self::Gap => f.pad(GAP_MARKER),
        }
    }
}

/// Edit operation labels (edit vector encoding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EditOp {
    /// M - reference and hypothesis tokens are equal
    Match,
    /// S - both sides hold different tokens
    Substitution,
    /// I - hypothesis token with a gap on the reference side
    Insert,
    /// D - reference token with a gap on the hypothesis side
    Delete,
}

impl EditOp {
    /// Convert to single-character representation for edit vector
    pub fn as_char(&self) -> char {
        match self {
            Self::Match => 'M',
            Self::Substitution => 'S',
            Self::Insert => 'I',
            Self::Delete => 'D',
        }
    }

    /// Parse from single character
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(Self::Match),
            'S' => Some(Self::Substitution),
            'I' => Some(Self::Insert),
            'D' => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Dense (|reference|+1) x (|hypothesis|+1) edit-distance table, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<u32>,
}

impl EditMatrix {
    /// Fill the table with unit costs for insertion, deletion and substitution
    /// and zero cost for a match.
    pub fn compute<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> Self {
        let rows = reference.len() + 1;
        let cols = hypothesis.len() + 1;
        let mut cells = vec![0u32; rows * cols];

        for i in 1..rows {
            cells[i * cols] = i as u32;
        }
        for (j, cell) in cells.iter_mut().enumerate().take(cols) {
            *cell = j as u32;
        }

        for i in 1..rows {
            for j in 1..cols {
                let diagonal = cells[(i - 1) * cols + (j - 1)];
                cells[i * cols + j] = if reference[i - 1] == hypothesis[j - 1] {
                    diagonal
                } else {
                    let up = cells[(i - 1) * cols + j];
                    let left = cells[i * cols + (j - 1)];
                    1 + diagonal.min(up).min(left)
                };
            }
        }

        Self { rows, cols, cells }
    }

    /// Number of cells a table for sequences of these lengths would hold
    pub fn cell_count(reference_len: usize, hypothesis_len: usize) -> usize {
        reference_len
            .saturating_add(1)
            .saturating_mul(hypothesis_len.saturating_add(1))
    }

    /// D[i][j], the distance between the first `i` reference tokens and the
    /// first `j` hypothesis tokens
    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.cols + j]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Minimum edit distance between the full sequences
    pub fn distance(&self) -> u32 {
        self.get(self.rows - 1, self.cols - 1)
    }
}

/// Per-category tallies for one aligned pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditCounts {
    pub matches: usize,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
}

impl EditCounts {
    /// Substitutions + deletions + insertions
    pub fn errors(&self) -> usize {
        self.substitutions + self.deletions + self.insertions
    }
}

/// Reference and hypothesis of equal length with gaps inserted, plus a match
/// flag per position. A position never holds a gap on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedPair<T> {
    reference: Vec<Slot<T>>,
    hypothesis: Vec<Slot<T>>,
    match_flags: Vec<bool>,
}

impl<T: PartialEq> AlignedPair<T> {
    fn from_slots(reference: Vec<Slot<T>>, hypothesis: Vec<Slot<T>>) -> Self {
        let match_flags = reference
            .iter()
            .zip(&hypothesis)
            .map(|(r, h)| matches!((r, h), (Slot::Token(r), Slot::Token(h)) if r == h))
            .collect();

        Self {
            reference,
            hypothesis,
            match_flags,
        }
    }
}

impl<T> AlignedPair<T> {
    pub fn reference(&self) -> &[Slot<T>] {
        &self.reference
    }

    pub fn hypothesis(&self) -> &[Slot<T>] {
        &self.hypothesis
    }

    /// True where both sides hold equal tokens
    pub fn match_flags(&self) -> &[bool] {
        &self.match_flags
    }

    pub fn len(&self) -> usize {
        self.match_flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.match_flags.is_empty()
    }

    /// Operation at each aligned position
    pub fn ops(&self) -> impl Iterator<Item = EditOp> + '_ {
        self.reference
            .iter()
            .zip(&self.hypothesis)
            .zip(&self.match_flags)
            .map(|((r, h), &matched)| {
                if matched {
                    EditOp::Match
                } else if h.is_gap() {
                    EditOp::Delete
                } else if r.is_gap() {
                    EditOp::Insert
                } else {
                    EditOp::Substitution
                }
            })
    }

    /// Edit vector string (e.g. "MMSMD")
    pub fn edit_vector(&self) -> String {
        self.ops().map(|op| op.as_char()).collect()
    }

    /// Classify every mismatched position, in alignment order
    pub fn errors(&self) -> impl Iterator<Item = ErrorEvent<&T>> + '_ {
        self.reference
            .iter()
            .zip(&self.hypothesis)
            .zip(&self.match_flags)
            .filter(|(_, matched)| !**matched)
            .filter_map(|((r, h), _)| match (r, h) {
                (Slot::Token(r), Slot::Gap) => Some(ErrorEvent::Deletion(r)),
                (Slot::Gap, Slot::Token(h)) => Some(ErrorEvent::Insertion(h)),
                (Slot::Token(r), Slot::Token(h)) => Some(ErrorEvent::Substitution(r, h)),
                (Slot::Gap, Slot::Gap) => None,
            })
    }

    pub fn counts(&self) -> EditCounts {
        self.ops().fold(EditCounts::default(), |mut counts, op| {
            match op {
                EditOp::Match => counts.matches += 1,
                EditOp::Substitution => counts.substitutions += 1,
                EditOp::Delete => counts.deletions += 1,
                EditOp::Insert => counts.insertions += 1,
            }
            counts
        })
    }

    /// Number of mismatched positions, equal to the minimum edit distance
    pub fn edit_distance(&self) -> usize {
        self.match_flags.iter().filter(|&&matched| !matched).count()
    }
}

/// Backtrack through the edit matrix to recover one optimal alignment
///
/// Checked in order at each cell: match, deletion, insertion, substitution.
pub fn backtrack_alignment<T: Clone + PartialEq>(
    matrix: &EditMatrix,
    reference: &[T],
    hypothesis: &[T],
) -> AlignedPair<T> {
    let mut ref_aligned = Vec::with_capacity(reference.len() + hypothesis.len());
    let mut hyp_aligned = Vec::with_capacity(reference.len() + hypothesis.len());
    let mut i = reference.len();
    let mut j = hypothesis.len();

    while i > 0 || j > 0 {
        if i > 0 && j > 0 && reference[i - 1] == hypothesis[j - 1] {
            ref_aligned.push(Slot::Token(reference[i - 1].clone()));
            hyp_aligned.push(Slot::Token(hypothesis[j - 1].clone()));
            i -= 1;
            j -= 1;
        } else if i > 0 && matrix.get(i, j) == matrix.get(i - 1, j) + 1 {
            ref_aligned.push(Slot::Token(reference[i - 1].clone()));
            hyp_aligned.push(Slot::Gap);
            i -= 1;
        } else if j > 0 && matrix.get(i, j) == matrix.get(i, j - 1) + 1 {
            ref_aligned.push(Slot::Gap);
            hyp_aligned.push(Slot::Token(hypothesis[j - 1].clone()));
            j -= 1;
        } else if i > 0 && j > 0 {
            ref_aligned.push(Slot::Token(reference[i - 1].clone()));
            hyp_aligned.push(Slot::Token(hypothesis[j - 1].clone()));
            i -= 1;
            j -= 1;
        } else {
            // a table built by EditMatrix::compute always satisfies one branch
            break;
        }
    }

    ref_aligned.reverse();
    hyp_aligned.reverse();
    AlignedPair::from_slots(ref_aligned, hyp_aligned)
}

/// Main entry point: align a hypothesis against its reference
pub fn align<T: Clone + PartialEq>(reference: &[T], hypothesis: &[T]) -> AlignedPair<T> {
    let matrix = EditMatrix::compute(reference, hypothesis);
    backtrack_alignment(&matrix, reference, hypothesis)
}
