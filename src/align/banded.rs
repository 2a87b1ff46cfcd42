//! Banded affine-gap dynamic programming with adaptive band growth.
//!
//! The aligner fills the three-layer affine DP (replacement, deletion,
//! insertion) restricted to a diagonal band `[left, right]`, one column at a
//! time over a single column buffer of score triples. When a traceback is
//! requested the band is additionally recorded, either as packed 2-bit
//! predecessor edges (one byte per cell) or as full score triples; both live
//! in growable arenas that are reused across calls.
//!
//! The outer driver starts from the narrowest band that contains the main
//! diagonal and grows it geometrically until the score provably cannot
//! improve (or an expected score is reached).

use crate::{
    align::{eoplist::Eoplist, matrices::ScoreScheme},
    seq::EncodedSubstring,
};

/// Predecessor kind of a DP edge. The discriminants are the 2-bit codes
/// packed into [`TraceBits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum TraceOp {
    Undef       = 0,
    Replacement = 1,
    Deletion    = 2,
    Insertion   = 3,
}

impl TraceOp {
    #[inline]
    fn from_code(code: u8) -> Self {
        match code & 3 {
            1 => TraceOp::Replacement,
            2 => TraceOp::Deletion,
            3 => TraceOp::Insertion,
            _ => TraceOp::Undef,
        }
    }

    #[inline]
    fn shift(self) -> u32 {
        2 * (self as u32 - 1)
    }
}

/// The backtracing edges for arriving at the R, D and I layers of one cell,
/// packed as three 2-bit fields in one byte.
#[derive(Debug, Clone, Copy, Default)]
struct TraceBits(u8);

impl TraceBits {
    /// A byte with only the field of `layer` set, pointing at `layer`'s own
    /// kind. Used to seed the first column and row of the band.
    #[inline]
    fn single(layer: TraceOp) -> Self {
        TraceBits((layer as u8) << layer.shift())
    }

    #[inline]
    fn all(rmaxedge: TraceOp, dmaxedge: TraceOp, imaxedge: TraceOp) -> Self {
        TraceBits(
            ((rmaxedge as u8) << TraceOp::Replacement.shift())
                | ((dmaxedge as u8) << TraceOp::Deletion.shift())
                | ((imaxedge as u8) << TraceOp::Insertion.shift()),
        )
    }

    #[inline]
    fn edge(self, layer: TraceOp) -> TraceOp {
        TraceOp::from_code(self.0 >> layer.shift())
    }
}

/// One DP cell: the best scores of alignments ending in a replacement, a
/// deletion (gap in the second sequence) and an insertion (gap in the first).
#[derive(Debug, Clone, Copy, Default)]
struct ScoreTriple {
    r: i32,
    d: i32,
    i: i32,
}

impl ScoreTriple {
    #[inline]
    fn max(&self) -> i32 {
        self.r.max(self.d).max(self.i)
    }
}

/// Active rows of column `j` under band `[left, right]`.
#[inline]
fn low_row_of(j: usize, right: i64) -> usize {
    if j <= right as usize { 0 } else { j - right as usize }
}

#[inline]
fn high_row_of(j: usize, ulen: usize, left: i64) -> usize {
    ulen.min(j + (-left) as usize)
}

/// Grows a buffer to `needed` elements, overshooting by the reuse-friendly
/// `max(needed, 1.2 * old + pad)` schedule.
fn grow_to<T: Clone + Default>(buffer: &mut Vec<T>, needed: usize, pad: usize) {
    if buffer.len() < needed {
        let target = needed.max(buffer.len() + buffer.len() / 5 + pad);
        buffer.resize(target, T::default());
    }
}

/// A reusable banded affine DP aligner.
///
/// `opt_memory` selects the compact trace-bit band representation over full
/// score triples when columns are kept for traceback.
pub struct DiagonalBandAligner {
    opt_memory:    bool,
    columnspace:   Vec<ScoreTriple>,
    col_start:     Vec<usize>,
    bits_arena:    Vec<TraceBits>,
    triples_arena: Vec<ScoreTriple>,
}

impl DiagonalBandAligner {
    #[must_use]
    pub fn new(opt_memory: bool) -> Self {
        Self {
            opt_memory,
            columnspace: Vec::new(),
            col_start: Vec::new(),
            bits_arena: Vec::new(),
            triples_arena: Vec::new(),
        }
    }

    /// The band growth schedule. The constants are load-bearing for
    /// reproducibility and are kept in integer arithmetic.
    #[inline]
    fn next_band_width(band_width: usize) -> usize {
        if band_width < 4 {
            return band_width * 2;
        }
        if band_width < 20 {
            return (band_width * 3) / 2;
        }
        (band_width * 5) / 4
    }

    /// Computes the global alignment of `u` and `v`, growing the band until
    /// one of the stop conditions holds:
    ///
    /// - `expected_score` is `Some(e)` and the DP score reached `e`;
    /// - `no_score_run` is set and the score did not change from the
    ///   previous bandwidth iteration;
    /// - neither is given (single run with the initial band);
    /// - the band already spans the whole matrix.
    ///
    /// When `eoplist` is `Some`, the band is recorded and the transcript of
    /// the final alignment is reconstructed into it.
    pub fn alignment_get(
        &mut self, mut eoplist: Option<&mut Eoplist>, gap_open: i8, gap_extension: i8, scheme: &ScoreScheme,
        useq: &EncodedSubstring<'_>, vseq: &EncodedSubstring<'_>, no_score_run: bool, expected_score: Option<u32>,
    ) -> i32 {
        debug_assert!(gap_open >= 0 && gap_extension > 0 && scheme.smallest_score < 0);
        let ulen = useq.len();
        let vlen = vseq.len();
        let mut band_width = 1 + ulen.abs_diff(vlen);
        let min_align_score = (ulen + vlen) as i32 * i32::from(scheme.smallest_score);
        let mut previous_dpscore = min_align_score;

        loop {
            let left_dist = (-(band_width as i64)).max(-(ulen as i64));
            let right_dist = (band_width as i64).min(vlen as i64);
            let keep_columns = eoplist.is_some();

            let dpscore = self.fill(
                keep_columns,
                gap_open,
                gap_extension,
                scheme,
                min_align_score,
                useq,
                vseq,
                left_dist,
                right_dist,
            );

            let full_matrix = left_dist == -(ulen as i64) && right_dist == vlen as i64;
            let reached = match expected_score {
                Some(expected) => dpscore >= expected as i32,
                None => !no_score_run,
            };
            let done = reached || (no_score_run && previous_dpscore == dpscore) || full_matrix;

            if done {
                if let Some(eoplist) = eoplist.as_deref_mut() {
                    self.traceback(eoplist, gap_open, gap_extension, useq, vseq, left_dist, right_dist);
                }
                return dpscore;
            }
            previous_dpscore = dpscore;
            band_width = Self::next_band_width(band_width);
        }
    }

    fn fill(
        &mut self, keep_columns: bool, gap_open: i8, gap_extension: i8, scheme: &ScoreScheme, min_align_score: i32,
        useq: &EncodedSubstring<'_>, vseq: &EncodedSubstring<'_>, left_dist: i64, right_dist: i64,
    ) -> i32 {
        let ulen = useq.len();
        let vlen = vseq.len();
        debug_assert!(
            left_dist <= 0.min(vlen as i64 - ulen as i64)
                && left_dist >= -(ulen as i64)
                && right_dist >= 0.max(vlen as i64 - ulen as i64)
                && right_dist <= vlen as i64
        );
        grow_to(&mut self.columnspace, ulen + 1, 128);
        if keep_columns {
            let band_width = (right_dist - left_dist + 1) as usize;
            grow_to(&mut self.col_start, vlen + 1, 128);
            if self.opt_memory {
                grow_to(&mut self.bits_arena, band_width * (vlen + 1), 1024);
                self.fill_bits(gap_open, gap_extension, scheme, min_align_score, useq, vseq, left_dist, right_dist)
            } else {
                grow_to(&mut self.triples_arena, band_width * (vlen + 1), 1024);
                self.fill_scores::<true>(
                    gap_open,
                    gap_extension,
                    scheme,
                    min_align_score,
                    useq,
                    vseq,
                    left_dist,
                    right_dist,
                )
            }
        } else {
            self.fill_scores::<false>(
                gap_open,
                gap_extension,
                scheme,
                min_align_score,
                useq,
                vseq,
                left_dist,
                right_dist,
            )
        }
    }

    /// Column sweep without traceback edges; with `KEEP_COLUMNS` the band
    /// rows of each finished column are copied into the triple arena.
    #[allow(clippy::too_many_arguments)]
    fn fill_scores<const KEEP_COLUMNS: bool>(
        &mut self, gap_open: i8, gap_extension: i8, scheme: &ScoreScheme, min_align_score: i32,
        useq: &EncodedSubstring<'_>, vseq: &EncodedSubstring<'_>, left_dist: i64, right_dist: i64,
    ) -> i32 {
        let ulen = useq.len();
        let vlen = vseq.len();
        let start_penalty = i32::from(gap_open) + i32::from(gap_extension);
        let gap_extension = i32::from(gap_extension);
        let mut high_row = (-left_dist) as usize;
        let mut cursor = 0usize;

        let cs = &mut self.columnspace;
        cs[0] = ScoreTriple {
            r: 0,
            d: -i32::from(gap_open),
            i: -i32::from(gap_open),
        };
        for i in 1..=high_row {
            cs[i] = ScoreTriple {
                r: min_align_score,
                d: cs[i - 1].d - gap_extension,
                i: min_align_score,
            };
        }
        let mut low_row = 0usize;
        if KEEP_COLUMNS {
            self.col_start[0] = 0;
            self.triples_arena[..=high_row].copy_from_slice(&cs[..=high_row]);
            cursor = high_row + 1;
        }
        let ucache: Vec<u8> = (0..ulen).map(|idx| useq.get(idx)).collect();
        for j in 1..=vlen {
            let cb = vseq.get(j - 1);
            debug_assert!(usize::from(cb) < scheme.alphabet_size);
            let mut first_ivalue = min_align_score;
            let prev_high_row = high_row;

            if j as i64 <= right_dist {
                first_ivalue = cs[low_row].i - gap_extension;
            }
            let mut nw = cs[low_row];
            cs[low_row] = ScoreTriple {
                r: min_align_score,
                d: min_align_score,
                i: first_ivalue,
            };

            let score_row = scheme.row(cb);
            // no branch in the inner loop (except for maximum computation)
            for i in low_row + 1..=prev_high_row {
                let ca = usize::from(ucache[i - 1]);
                let score_from_r1 = cs[i - 1].r - start_penalty;
                let score_from_d = cs[i - 1].d - gap_extension;
                let score_from_r2 = cs[i].r - start_penalty;
                let score_from_i = cs[i].i - gap_extension;
                let current = ScoreTriple {
                    r: nw.max() + i32::from(score_row[ca]),
                    d: score_from_r1.max(score_from_d),
                    i: score_from_r2.max(score_from_i),
                };
                nw = cs[i];
                cs[i] = current;
            }
            if high_row < ulen {
                let ca = usize::from(ucache[high_row]);
                high_row += 1;
                let score_from_r = cs[prev_high_row].r - start_penalty;
                let score_from_d = cs[prev_high_row].d - gap_extension;
                cs[high_row] = ScoreTriple {
                    r: nw.max() + i32::from(score_row[ca]),
                    d: score_from_r.max(score_from_d),
                    i: min_align_score,
                };
            }
            if j as i64 > right_dist {
                low_row += 1;
            }
            if KEEP_COLUMNS {
                self.col_start[j] = cursor;
                let width = high_row - low_row + 1;
                self.triples_arena[cursor..cursor + width].copy_from_slice(&cs[low_row..=high_row]);
                cursor += width;
            }
            debug_assert!(
                low_row == low_row_of(j, right_dist) && high_row == high_row_of(j, ulen, left_dist)
            );
        }
        cs[ulen].r
    }

    /// Column sweep that records the winning predecessor edges of every band
    /// cell as packed trace bits.
    #[allow(clippy::too_many_arguments)]
    fn fill_bits(
        &mut self, gap_open: i8, gap_extension: i8, scheme: &ScoreScheme, min_align_score: i32,
        useq: &EncodedSubstring<'_>, vseq: &EncodedSubstring<'_>, left_dist: i64, right_dist: i64,
    ) -> i32 {
        let ulen = useq.len();
        let vlen = vseq.len();
        let start_penalty = i32::from(gap_open) + i32::from(gap_extension);
        let gap_extension_w = i32::from(gap_extension);
        let mut high_row = (-left_dist) as usize;

        let cs = &mut self.columnspace;
        cs[0] = ScoreTriple {
            r: 0,
            d: -i32::from(gap_open),
            i: -i32::from(gap_open),
        };
        self.col_start[0] = 0;
        for i in 1..=high_row {
            self.bits_arena[i] = TraceBits::single(TraceOp::Deletion);
            cs[i] = ScoreTriple {
                r: min_align_score,
                d: cs[i - 1].d - gap_extension_w,
                i: min_align_score,
            };
        }
        let mut cursor = high_row + 1;
        let mut low_row = 0usize;
        let ucache: Vec<u8> = (0..ulen).map(|idx| useq.get(idx)).collect();
        for j in 1..=vlen {
            let cb = vseq.get(j - 1);
            debug_assert!(usize::from(cb) < scheme.alphabet_size);
            let mut first_ivalue = min_align_score;
            let prev_high_row = high_row;
            let base_row = low_row_of(j, right_dist);
            self.col_start[j] = cursor;

            if j as i64 <= right_dist {
                first_ivalue = cs[low_row].i - gap_extension_w;
                debug_assert!(base_row == low_row);
                self.bits_arena[cursor] = TraceBits::single(TraceOp::Insertion);
            }
            let mut nw = cs[low_row];
            cs[low_row] = ScoreTriple {
                r: min_align_score,
                d: min_align_score,
                i: first_ivalue,
            };

            if high_row < ulen {
                high_row += 1;
            }
            let score_row = scheme.row(cb);
            for i in low_row + 1..=high_row {
                let mut rmaxedge = TraceOp::Replacement;
                let mut rvalue = nw.r;
                if rvalue < nw.d {
                    rvalue = nw.d;
                    rmaxedge = TraceOp::Deletion;
                }
                if rvalue < nw.i {
                    rvalue = nw.i;
                    rmaxedge = TraceOp::Insertion;
                }
                rvalue += i32::from(score_row[usize::from(ucache[i - 1])]);

                let score_from_r = cs[i - 1].r - start_penalty;
                let score_from_d = cs[i - 1].d - gap_extension_w;
                let dvalue = score_from_r.max(score_from_d);
                let dmaxedge = if score_from_r >= score_from_d {
                    TraceOp::Replacement
                } else {
                    TraceOp::Deletion
                };

                let mut ivalue = min_align_score;
                let mut imaxedge = TraceOp::Undef;
                if i <= prev_high_row {
                    let score_from_r = cs[i].r - start_penalty;
                    let score_from_i = cs[i].i - gap_extension_w;
                    ivalue = score_from_r.max(score_from_i);
                    imaxedge = if score_from_r >= score_from_i {
                        TraceOp::Replacement
                    } else {
                        TraceOp::Insertion
                    };
                }
                nw = cs[i];
                cs[i] = ScoreTriple {
                    r: rvalue,
                    d: dvalue,
                    i: ivalue,
                };
                self.bits_arena[cursor + (i - base_row)] = TraceBits::all(rmaxedge, dmaxedge, imaxedge);
            }
            if j as i64 > right_dist {
                low_row += 1;
            }
            cursor += high_row - base_row + 1;
        }
        cs[ulen].r
    }

    fn traceback(
        &self, eoplist: &mut Eoplist, gap_open: i8, gap_extension: i8, useq: &EncodedSubstring<'_>,
        vseq: &EncodedSubstring<'_>, left_dist: i64, right_dist: i64,
    ) {
        eoplist.reset();
        if self.opt_memory {
            self.traceback_bits(eoplist, useq, vseq, right_dist);
        } else {
            self.traceback_scores(eoplist, gap_open, gap_extension, useq, vseq, left_dist, right_dist);
        }
        eoplist.reverse_end(0);
    }

    #[inline]
    fn bits_at(&self, i: usize, j: usize, right_dist: i64) -> TraceBits {
        self.bits_arena[self.col_start[j] + i - low_row_of(j, right_dist)]
    }

    #[inline]
    fn triple_at(&self, i: usize, j: usize, right_dist: i64) -> &ScoreTriple {
        &self.triples_arena[self.col_start[j] + i - low_row_of(j, right_dist)]
    }

    /// Follows the recorded 2-bit edges from `(ulen, vlen)` on the R layer
    /// back to `(0, 0)`.
    fn traceback_bits(
        &self, eoplist: &mut Eoplist, useq: &EncodedSubstring<'_>, vseq: &EncodedSubstring<'_>, right_dist: i64,
    ) {
        let mut edge = TraceOp::Replacement;
        let mut i = useq.len();
        let mut j = vseq.len();
        while i > 0 || j > 0 {
            let trace_bits = self.bits_at(i, j, right_dist);
            match edge {
                TraceOp::Replacement => {
                    debug_assert!(i > 0 && j > 0);
                    if useq.get(i - 1) == vseq.get(j - 1) {
                        eoplist.match_add(1);
                    } else {
                        eoplist.mismatch_add();
                    }
                    edge = trace_bits.edge(TraceOp::Replacement);
                    i -= 1;
                    j -= 1;
                }
                TraceOp::Deletion => {
                    eoplist.deletion_add();
                    edge = trace_bits.edge(TraceOp::Deletion);
                    debug_assert!(i > 0);
                    i -= 1;
                }
                _ => {
                    debug_assert!(edge == TraceOp::Insertion && j > 0);
                    eoplist.insertion_add();
                    edge = trace_bits.edge(TraceOp::Insertion);
                    j -= 1;
                }
            }
        }
    }

    /// Recomputes the winning predecessor at every backward step from the
    /// stored score triples. The tie rules mirror the forward sweep: the
    /// replacement layer is left only when a gap layer is strictly greater,
    /// and a gap layer returns to the replacement layer on equality.
    fn traceback_scores(
        &self, eoplist: &mut Eoplist, gap_open: i8, gap_extension: i8, useq: &EncodedSubstring<'_>,
        vseq: &EncodedSubstring<'_>, left_dist: i64, right_dist: i64,
    ) {
        let start_penalty = i32::from(gap_open) + i32::from(gap_extension);
        let gap_extension = i32::from(gap_extension);
        let mut edge = TraceOp::Replacement;
        let mut i = useq.len();
        let mut j = vseq.len();
        while i > 0 || j > 0 {
            match edge {
                TraceOp::Replacement => {
                    debug_assert!(i > 0 && j > 0);
                    if useq.get(i - 1) == vseq.get(j - 1) {
                        eoplist.match_add(1);
                    } else {
                        eoplist.mismatch_add();
                    }
                    i -= 1;
                    j -= 1;
                    debug_assert!(
                        i >= low_row_of(j, right_dist) && i <= high_row_of(j, useq.len(), left_dist)
                    );
                    let previous = self.triple_at(i, j, right_dist);
                    let maxvalue = previous.max();
                    if maxvalue > previous.r {
                        if maxvalue == previous.d {
                            edge = TraceOp::Deletion;
                        } else if maxvalue == previous.i {
                            edge = TraceOp::Insertion;
                        }
                    }
                }
                TraceOp::Deletion => {
                    eoplist.deletion_add();
                    i -= 1;
                    debug_assert!(
                        i >= low_row_of(j, right_dist) && i <= high_row_of(j, useq.len(), left_dist)
                    );
                    let previous = self.triple_at(i, j, right_dist);
                    if previous.r - start_penalty >= previous.d - gap_extension {
                        edge = TraceOp::Replacement;
                    }
                }
                _ => {
                    debug_assert!(edge == TraceOp::Insertion && j > 0);
                    eoplist.insertion_add();
                    j -= 1;
                    debug_assert!(
                        i >= low_row_of(j, right_dist) && i <= high_row_of(j, useq.len(), left_dist)
                    );
                    let previous = self.triple_at(i, j, right_dist);
                    if previous.r - start_penalty >= previous.i - gap_extension {
                        edge = TraceOp::Replacement;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::matrices::{UNIT_SCORE_NUC, UNIT_SCORE_NUC_2_2};

    fn encode(seq: &[u8]) -> Vec<u8> {
        let table = UNIT_SCORE_NUC.encoding();
        seq.iter().map(|&c| table[usize::from(c)]).collect()
    }

    fn align_with(
        opt_memory: bool, scheme: &ScoreScheme, u: &[u8], v: &[u8], gap_open: i8, gap_extension: i8,
    ) -> (i32, Eoplist) {
        let u = encode(u);
        let v = encode(v);
        let usub = EncodedSubstring::new(&u, 0, u.len());
        let vsub = EncodedSubstring::new(&v, 0, v.len());
        let mut aligner = DiagonalBandAligner::new(opt_memory);
        let mut eoplist = Eoplist::new();
        let score = aligner.alignment_get(
            Some(&mut eoplist),
            gap_open,
            gap_extension,
            scheme,
            &usub,
            &vsub,
            true,
            None,
        );
        (score, eoplist)
    }

    #[test]
    fn identical_sequences_align_without_gaps() {
        for opt_memory in [false, true] {
            let (score, eoplist) = align_with(opt_memory, &UNIT_SCORE_NUC, b"ACGTACGT", b"ACGTACGT", 11, 1);
            assert_eq!(score, 16);
            assert_eq!(eoplist.cigar_string(true), "8=");
        }
    }

    #[test]
    fn block_deletion_is_found_with_affine_costs() {
        // 6 matches * 2 - (4 + 3 * 2) = 2
        for opt_memory in [false, true] {
            let (score, eoplist) = align_with(opt_memory, &UNIT_SCORE_NUC_2_2, b"AAACCCGGG", b"AAAGGG", 4, 2);
            assert_eq!(score, 2);
            assert_eq!(eoplist.cigar_string(true), "3=3D3=");
        }
    }

    #[test]
    fn traceback_score_matches_dp_score() {
        let cases: &[(&[u8], &[u8])] = &[
            (b"ACGTACGT", b"ACGAACGT"),
            (b"AAACCCGGG", b"AAAGGG"),
            (b"ACACAC", b"ACGCACAC"),
            (b"TTTT", b"TTTTTTTT"),
        ];
        for &(u, v) in cases {
            for opt_memory in [false, true] {
                let (score, eoplist) = align_with(opt_memory, &UNIT_SCORE_NUC_2_2, u, v, 4, 2);
                let ue = encode(u);
                let ve = encode(v);
                let transcript_score = eoplist.evaluate_score(
                    &EncodedSubstring::new(&ue, 0, ue.len()),
                    &EncodedSubstring::new(&ve, 0, ve.len()),
                    4,
                    2,
                    &UNIT_SCORE_NUC_2_2,
                );
                assert_eq!(score, transcript_score, "u={u:?} v={v:?} opt_memory={opt_memory}");
            }
        }
    }

    #[test]
    fn bit_and_score_mode_tracebacks_agree() {
        let cases: &[(&[u8], &[u8])] = &[(b"ACGTACGT", b"ACGAACGT"), (b"AAACCCGGG", b"AAAGGG")];
        for &(u, v) in cases {
            let (score_a, eoplist_a) = align_with(false, &UNIT_SCORE_NUC_2_2, u, v, 4, 2);
            let (score_b, eoplist_b) = align_with(true, &UNIT_SCORE_NUC_2_2, u, v, 4, 2);
            assert_eq!(score_a, score_b);
            assert_eq!(eoplist_a, eoplist_b);
        }
    }

    #[test]
    fn wider_bands_do_not_change_a_contained_optimum() {
        let u = encode(b"ACGTACGTAC");
        let v = encode(b"ACGTACGTAC");
        let usub = EncodedSubstring::new(&u, 0, u.len());
        let vsub = EncodedSubstring::new(&v, 0, v.len());
        let mut aligner = DiagonalBandAligner::new(false);
        let narrow = aligner.fill(false, 11, 1, &UNIT_SCORE_NUC, -20, &usub, &vsub, -1, 1);
        let wide = aligner.fill(false, 11, 1, &UNIT_SCORE_NUC, -20, &usub, &vsub, -8, 8);
        assert_eq!(narrow, wide);
        assert_eq!(narrow, 20);
    }

    #[test]
    fn band_growth_is_monotone_and_stabilises() {
        // Equal-length sequences with a displaced 30 character block: the
        // initial band of width 1 cannot contain the two compensating gaps,
        // the grown band can.
        let left: Vec<u8> = b"ACGT".iter().copied().cycle().take(40).collect();
        let right: Vec<u8> = b"TGCA".iter().copied().cycle().take(40).collect();
        let block = vec![b'C'; 30];
        let u: Vec<u8> = left.iter().chain(right.iter()).chain(block.iter()).copied().collect();
        let v: Vec<u8> = left.iter().chain(block.iter()).chain(right.iter()).copied().collect();

        let ue = encode(&u);
        let ve = encode(&v);
        let usub = EncodedSubstring::new(&ue, 0, ue.len());
        let vsub = EncodedSubstring::new(&ve, 0, ve.len());

        let mut aligner = DiagonalBandAligner::new(false);
        let mut band_width = 1 + ue.len().abs_diff(ve.len());
        let mut scores = Vec::new();
        loop {
            let left_dist = (-(band_width as i64)).max(-(ue.len() as i64));
            let right_dist = (band_width as i64).min(ve.len() as i64);
            scores.push(aligner.fill(false, 4, 2, &UNIT_SCORE_NUC_2_2, -1000, &usub, &vsub, left_dist, right_dist));
            if scores.len() >= 2 && scores[scores.len() - 2] == scores[scores.len() - 1] {
                break;
            }
            band_width = DiagonalBandAligner::next_band_width(band_width);
        }
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        // 80 matches * 2, one 30 character insertion and one 30 character
        // deletion at 4/2 gap costs
        assert_eq!(*scores.last().unwrap(), 80 * 2 - 2 * (4 + 30 * 2));
        assert!(band_width >= 31);
        assert!(band_width < ve.len());
    }

    #[test]
    fn growth_schedule_constants() {
        assert_eq!(DiagonalBandAligner::next_band_width(1), 2);
        assert_eq!(DiagonalBandAligner::next_band_width(3), 6);
        assert_eq!(DiagonalBandAligner::next_band_width(4), 6);
        assert_eq!(DiagonalBandAligner::next_band_width(10), 15);
        assert_eq!(DiagonalBandAligner::next_band_width(20), 25);
    }
}
