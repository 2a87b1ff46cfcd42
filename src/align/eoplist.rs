//! Run-length encoded alignment transcripts.
//!
//! A transcript is a dense byte array. A byte value below 253 encodes a run
//! of `value + 1` matches; the three reserved values encode one mismatch
//! (253), one deletion (254) or one insertion (255) each. Derived counts are
//! maintained incrementally so that identity and coverage never require a
//! scan.

use crate::{
    SwError, SwResult,
    align::matrices::ScoreScheme,
    seq::EncodedSubstring,
};

/// Highest run length a single match byte can encode.
const MAX_MATCH_RUN: usize = 253;
const CODE_MISMATCH: u8 = 253;
const CODE_DELETION: u8 = 254;
const CODE_INSERTION: u8 = 255;

/// The kind of one edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EopType {
    Deletion,
    Insertion,
    Mismatch,
    Match,
}

/// A coalesced CIGAR operator: an operation kind and how often it repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOperator {
    pub op:        EopType,
    pub iteration: usize,
}

impl CigarOperator {
    /// The CIGAR character for this operator. With
    /// `distinguish_mismatch_match`, matches render as `=` and mismatches as
    /// `X`; otherwise both render as `M`.
    #[must_use]
    pub fn to_char(self, distinguish_mismatch_match: bool) -> char {
        match (self.op, distinguish_mismatch_match) {
            (EopType::Deletion, _) => 'D',
            (EopType::Insertion, _) => 'I',
            (EopType::Mismatch, true) => 'X',
            (EopType::Match, true) => '=',
            (EopType::Mismatch | EopType::Match, false) => 'M',
        }
    }
}

/// A run-length encoded edit operation list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Eoplist {
    ops:              Vec<u8>,
    matches:          usize,
    mismatches:       usize,
    deletions:        usize,
    insertions:       usize,
    gap_opens:        usize,
    previous_was_gap: bool,
}

impl Eoplist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a CIGAR string. `M` and `=` both count as matches.
    ///
    /// ## Errors
    ///
    /// Returns [`SwError::MalformedCigar`] for any operator outside `MIDX=`.
    pub fn from_cigar(cigar: &str) -> SwResult<Self> {
        let mut eoplist = Self::new();
        let mut iteration = 0usize;
        for cc in cigar.chars() {
            if let Some(digit) = cc.to_digit(10) {
                iteration = iteration * 10 + digit as usize;
                continue;
            }
            match cc {
                'D' => (0..iteration).for_each(|_| eoplist.deletion_add()),
                'I' => (0..iteration).for_each(|_| eoplist.insertion_add()),
                'X' => (0..iteration).for_each(|_| eoplist.mismatch_add()),
                'M' | '=' => eoplist.match_add(iteration),
                _ => return Err(SwError::MalformedCigar(cc)),
            }
            iteration = 0;
        }
        Ok(eoplist)
    }

    /// Clears the transcript in place, keeping the allocation.
    pub fn reset(&mut self) {
        self.ops.clear();
        self.matches = 0;
        self.mismatches = 0;
        self.deletions = 0;
        self.insertions = 0;
        self.gap_opens = 0;
        self.previous_was_gap = false;
    }

    /// Appends `length` matches, extending the final match run before
    /// emitting new run bytes.
    pub fn match_add(&mut self, mut length: usize) {
        debug_assert!(length > 0);
        self.matches += length;
        while length > 0 {
            match self.ops.last_mut() {
                Some(last) if usize::from(*last) < MAX_MATCH_RUN - 1 => {
                    let capacity = MAX_MATCH_RUN - 1 - usize::from(*last);
                    if length <= capacity {
                        *last += length as u8;
                        length = 0;
                    } else {
                        *last = (MAX_MATCH_RUN - 1) as u8;
                        length -= capacity;
                    }
                }
                _ if length <= MAX_MATCH_RUN => {
                    self.ops.push((length - 1) as u8);
                    length = 0;
                }
                _ => {
                    self.ops.push((MAX_MATCH_RUN - 1) as u8);
                    length -= MAX_MATCH_RUN;
                }
            }
        }
        self.previous_was_gap = false;
    }

    pub fn mismatch_add(&mut self) {
        self.ops.push(CODE_MISMATCH);
        self.mismatches += 1;
        self.previous_was_gap = false;
    }

    pub fn deletion_add(&mut self) {
        self.indel_add(CODE_DELETION);
        self.deletions += 1;
    }

    pub fn insertion_add(&mut self) {
        self.indel_add(CODE_INSERTION);
        self.insertions += 1;
    }

    fn indel_add(&mut self, code: u8) {
        self.ops.push(code);
        if !self.previous_was_gap {
            self.gap_opens += 1;
            self.previous_was_gap = true;
        }
    }

    /// Reverses the byte array from `first_index` to the end. Every reserved
    /// code is self-contained in one byte, so a backwards-constructed
    /// traceback becomes a forward transcript by plain byte reversal.
    pub fn reverse_end(&mut self, first_index: usize) {
        if first_index + 1 >= self.ops.len() {
            return;
        }
        self.ops[first_index..].reverse();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn count_matches(&self) -> usize {
        self.matches
    }

    #[inline]
    #[must_use]
    pub fn count_mismatches(&self) -> usize {
        self.mismatches
    }

    #[inline]
    #[must_use]
    pub fn count_deletions(&self) -> usize {
        self.deletions
    }

    #[inline]
    #[must_use]
    pub fn count_insertions(&self) -> usize {
        self.insertions
    }

    #[inline]
    #[must_use]
    pub fn count_gap_opens(&self) -> usize {
        self.gap_opens
    }

    /// Sum of the aligned lengths on both sequences; replacements count
    /// twice.
    #[must_use]
    pub fn aligned_len(&self) -> usize {
        self.deletions + self.insertions + 2 * (self.mismatches + self.matches)
    }

    /// Number of characters of the first sequence covered by the transcript.
    #[must_use]
    pub fn aligned_len_u(&self) -> usize {
        self.deletions + self.mismatches + self.matches
    }

    /// Number of characters of the second sequence covered by the transcript.
    #[must_use]
    pub fn aligned_len_v(&self) -> usize {
        self.insertions + self.mismatches + self.matches
    }

    #[must_use]
    pub fn errors(&self) -> usize {
        self.deletions + self.insertions + self.mismatches
    }

    #[must_use]
    pub fn error_percentage(&self) -> f64 {
        200.0 * self.errors() as f64 / self.aligned_len() as f64
    }

    /// Iterates the transcript as coalesced CIGAR operators. With
    /// `distinguish_mismatch_match = false`, adjacent match and mismatch runs
    /// merge into one `M` operator.
    #[must_use]
    pub fn cigar_ops(&self, distinguish_mismatch_match: bool) -> CigarIter<'_> {
        CigarIter {
            ops: &self.ops,
            idx: 0,
            distinguish_mismatch_match,
        }
    }

    #[must_use]
    pub fn cigar_string(&self, distinguish_mismatch_match: bool) -> String {
        let mut out = String::new();
        for co in self.cigar_ops(distinguish_mismatch_match) {
            out.push_str(&co.iteration.to_string());
            out.push(co.to_char(distinguish_mismatch_match));
        }
        out
    }

    /// Deterministically re-scores the transcript against the two sequences
    /// it aligns. A gap of `k` characters costs `gap_open + k * gap_extend`.
    /// Used to assert that a DP score and its traceback agree.
    #[must_use]
    pub fn evaluate_score(
        &self, useq: &EncodedSubstring<'_>, vseq: &EncodedSubstring<'_>, gap_open: i8, gap_extend: i8,
        scheme: &ScoreScheme,
    ) -> i32 {
        let mut idx_u = 0;
        let mut idx_v = 0;
        let mut sum_score = 0i32;
        for co in self.cigar_ops(true) {
            match co.op {
                EopType::Match | EopType::Mismatch => {
                    for _ in 0..co.iteration {
                        sum_score += i32::from(scheme.score(useq.get(idx_u), vseq.get(idx_v)));
                        idx_u += 1;
                        idx_v += 1;
                    }
                }
                EopType::Deletion => {
                    sum_score -= i32::from(gap_open) + co.iteration as i32 * i32::from(gap_extend);
                    idx_u += co.iteration;
                }
                EopType::Insertion => {
                    sum_score -= i32::from(gap_open) + co.iteration as i32 * i32::from(gap_extend);
                    idx_v += co.iteration;
                }
            }
        }
        debug_assert!(idx_u == useq.len() && idx_v == vseq.len());
        sum_score
    }
}

/// Coalescing iterator over a transcript's CIGAR operators.
pub struct CigarIter<'a> {
    ops:                       &'a [u8],
    idx:                       usize,
    distinguish_mismatch_match: bool,
}

impl CigarIter<'_> {
    fn classify(&self, code: u8) -> (EopType, usize) {
        match code {
            CODE_DELETION => (EopType::Deletion, 1),
            CODE_INSERTION => (EopType::Insertion, 1),
            CODE_MISMATCH => {
                let op = if self.distinguish_mismatch_match {
                    EopType::Mismatch
                } else {
                    EopType::Match
                };
                (op, 1)
            }
            run => (EopType::Match, usize::from(run) + 1),
        }
    }
}

impl Iterator for CigarIter<'_> {
    type Item = CigarOperator;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.ops.len() {
            return None;
        }
        let (op, mut iteration) = self.classify(self.ops[self.idx]);
        self.idx += 1;
        while self.idx < self.ops.len() {
            let (next_op, count) = self.classify(self.ops[self.idx]);
            if next_op != op {
                break;
            }
            iteration += count;
            self.idx += 1;
        }
        Some(CigarOperator { op, iteration })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::matrices::UNIT_SCORE_NUC_2_2;

    #[test]
    fn cigar_round_trip() {
        let mut eoplist = Eoplist::new();
        eoplist.match_add(3);
        eoplist.mismatch_add();
        eoplist.deletion_add();
        eoplist.deletion_add();
        eoplist.match_add(2);
        eoplist.insertion_add();
        let rendered = eoplist.cigar_string(true);
        assert_eq!(rendered, "3=1X2D2=1I");
        assert_eq!(Eoplist::from_cigar(&rendered).unwrap(), eoplist);
    }

    #[test]
    fn undistinguished_rendering_merges_replacements() {
        let mut eoplist = Eoplist::new();
        eoplist.match_add(2);
        eoplist.mismatch_add();
        eoplist.match_add(1);
        assert_eq!(eoplist.cigar_string(false), "4M");
        assert_eq!(eoplist.cigar_string(true), "2=1X1=");
    }

    #[test]
    fn long_match_runs_split_and_conserve_counts() {
        let mut eoplist = Eoplist::new();
        eoplist.match_add(100);
        eoplist.match_add(300);
        assert_eq!(eoplist.count_matches(), 400);
        assert_eq!(eoplist.cigar_string(true), "400=");
        let ops: Vec<_> = eoplist.cigar_ops(true).collect();
        assert_eq!(ops, vec![CigarOperator { op: EopType::Match, iteration: 400 }]);
    }

    #[test]
    fn length_identities() {
        let eoplist = Eoplist::from_cigar("5=2X3D4I").unwrap();
        assert_eq!(
            eoplist.aligned_len_u(),
            eoplist.count_deletions() + eoplist.count_mismatches() + eoplist.count_matches()
        );
        assert_eq!(
            eoplist.aligned_len_v(),
            eoplist.count_insertions() + eoplist.count_mismatches() + eoplist.count_matches()
        );
        assert_eq!(eoplist.aligned_len(), eoplist.aligned_len_u() + eoplist.aligned_len_v());
    }

    #[test]
    fn gap_opens_count_runs_not_characters() {
        let eoplist = Eoplist::from_cigar("2=3D1=2I2D").unwrap();
        assert_eq!(eoplist.count_gap_opens(), 3);
    }

    #[test]
    fn reverse_end_turns_backward_transcripts_forward() {
        let mut eoplist = Eoplist::new();
        eoplist.deletion_add();
        eoplist.mismatch_add();
        eoplist.match_add(1);
        eoplist.reverse_end(0);
        assert_eq!(eoplist.cigar_string(true), "1=1X1D");
    }

    #[test]
    fn unknown_cigar_operator_is_rejected() {
        assert!(matches!(
            Eoplist::from_cigar("3=2P"),
            Err(SwError::MalformedCigar('P'))
        ));
    }

    #[test]
    fn evaluate_score_applies_affine_gap_costs() {
        // AAACCCGGG vs AAAGGG under unit_score_nuc_2_2 with gaps 4/2:
        // 6 matches * 2 - (4 + 3 * 2) = 2
        let u = [0u8, 0, 0, 1, 1, 1, 2, 2, 2];
        let v = [0u8, 0, 0, 2, 2, 2];
        let eoplist = Eoplist::from_cigar("3=3D3=").unwrap();
        let score = eoplist.evaluate_score(
            &EncodedSubstring::new(&u, 0, u.len()),
            &EncodedSubstring::new(&v, 0, v.len()),
            4,
            2,
            &UNIT_SCORE_NUC_2_2,
        );
        assert_eq!(score, 2);
    }
}
