//! Striped SIMD Smith-Waterman local alignment.
//!
//! A query is preprocessed once into a striped profile; each database
//! sequence is then swept in a single forward pass yielding the raw score
//! and end coordinates. Start coordinates are recovered by a second sweep
//! over the reversed prefix, fed with the known score so it can stop early.
//! The 8-bit pass recovers from saturation by rerunning in 16 bits.

mod kernel;

pub use kernel::{LANES_I16, LANES_U8, segment_len};

use crate::align::{coords::LocalAlignmentCoordinates, matrices::ScoreScheme};
use kernel::{KernelOutcome, SwSimdResult, V8, V16, sw_simd_i16, sw_simd_u8};

fn valid_sequence(seq: &[u8], alphabet_size: usize) -> bool {
    seq.iter().all(|&code| usize::from(code) < alphabet_size)
}

fn seq_profile_u8(scheme: &ScoreScheme, bias: u8, seq: &[u8], backward: bool) -> Vec<V8> {
    let seg_len = segment_len(seq.len(), LANES_U8);
    let mut profile = vec![V8::splat(0); scheme.alphabet_size * seg_len];
    for c in 0..scheme.alphabet_size {
        let score_row = scheme.row(c as u8);
        for i in 0..seg_len {
            let mut lanes = [0u8; LANES_U8];
            let mut seq_pos = i;
            for lane in &mut lanes {
                if seq_pos < seq.len() {
                    let idx = if backward { seq.len() - 1 - seq_pos } else { seq_pos };
                    *lane = (i16::from(bias) + i16::from(score_row[usize::from(seq[idx])])) as u8;
                }
                seq_pos += seg_len;
            }
            profile[c * seg_len + i] = V8::from_array(lanes);
        }
    }
    profile
}

fn seq_profile_i16(scheme: &ScoreScheme, seq: &[u8], backward: bool) -> Vec<V16> {
    let seg_len = segment_len(seq.len(), LANES_I16);
    let mut profile = vec![V16::splat(0); scheme.alphabet_size * seg_len];
    for c in 0..scheme.alphabet_size {
        let score_row = scheme.row(c as u8);
        for i in 0..seg_len {
            let mut lanes = [0i16; LANES_I16];
            let mut seq_pos = i;
            for lane in &mut lanes {
                if seq_pos < seq.len() {
                    let idx = if backward { seq.len() - 1 - seq_pos } else { seq_pos };
                    *lane = i16::from(score_row[usize::from(seq[idx])]);
                }
                seq_pos += seg_len;
            }
            profile[c * seg_len + i] = V16::from_array(lanes);
        }
    }
    profile
}

/// A striped profile of one query sequence, immutable after construction.
pub struct SswProfile<'a> {
    scheme:             &'a ScoreScheme,
    abs_smallest_score: u8,
    query:              &'a [u8],
    profile_u8:         Vec<V8>,
    profile_i16:        Vec<V16>,
}

impl<'a> SswProfile<'a> {
    #[must_use]
    pub fn new(scheme: &'a ScoreScheme, query: &'a [u8]) -> Self {
        debug_assert!(valid_sequence(query, scheme.alphabet_size));
        let abs_smallest_score = scheme.smallest_score.unsigned_abs();
        Self {
            scheme,
            abs_smallest_score,
            query,
            profile_u8: seq_profile_u8(scheme, abs_smallest_score, query, false),
            profile_i16: seq_profile_i16(scheme, query, false),
        }
    }

    #[inline]
    #[must_use]
    pub fn query_len(&self) -> usize {
        self.query.len()
    }
}

/// The per-thread working registers of the striped sweeps, sized once for
/// the longest sequence of the input and zeroed before every sweep.
pub struct SswResources {
    vectors8:  Vec<V8>,
    vectors16: Vec<V16>,
}

impl SswResources {
    #[must_use]
    pub fn new(maximum_seq_len: usize) -> Self {
        Self {
            vectors8:  vec![V8::splat(0); 4 * segment_len(maximum_seq_len, LANES_U8)],
            vectors16: vec![V16::splat(0); 4 * segment_len(maximum_seq_len, LANES_I16)],
        }
    }

    fn vectors8(&mut self, seg_len: usize) -> &mut [V8] {
        let slice = &mut self.vectors8[..4 * seg_len];
        slice.fill(V8::splat(0));
        slice
    }

    fn vectors16(&mut self, seg_len: usize) -> &mut [V16] {
        let slice = &mut self.vectors16[..4 * seg_len];
        slice.fill(V16::splat(0));
        slice
    }
}

/// Computes the best local alignment of the profile's query against
/// `dbseq`.
///
/// `weight_gap_o` must already include the extension cost of the first gap
/// character. With `compute_only_end` only the end coordinates are filled in
/// (the substring lengths stay zero); otherwise a reverse sweep recovers the
/// start coordinates. With `forward_strand = false` the database sequence is
/// read as its reverse complement, synthesised on the fly.
pub fn ssw_align(
    profile: &SswProfile<'_>, resources: &mut SswResources, dbseq: &[u8], weight_gap_o: u8, weight_gap_e: u8,
    compute_only_end: bool, forward_strand: bool,
) -> LocalAlignmentCoordinates {
    debug_assert!(valid_sequence(dbseq, profile.scheme.alphabet_size));
    let query_len = profile.query_len();
    let mut use_16bit = false;

    let forward = match sw_simd_u8(
        dbseq,
        dbseq.len(),
        query_len,
        weight_gap_o,
        weight_gap_e,
        &profile.profile_u8,
        0,
        profile.abs_smallest_score,
        true,
        forward_strand,
        resources.vectors8(segment_len(query_len, LANES_U8)),
    ) {
        KernelOutcome::Done(result) => result,
        KernelOutcome::Overflow => {
            use_16bit = true;
            sw_simd_i16(
                dbseq,
                dbseq.len(),
                query_len,
                weight_gap_o,
                weight_gap_e,
                &profile.profile_i16,
                0,
                true,
                forward_strand,
                resources.vectors16(segment_len(query_len, LANES_I16)),
            )
        }
    };
    if compute_only_end {
        return LocalAlignmentCoordinates {
            ustart:           forward.on_query,
            usubstringlength: 0,
            vstart:           forward.on_dbseq,
            vsubstringlength: 0,
            raw_score:        u32::from(forward.score),
            forward_strand,
        };
    }

    // reverse-read sweep over the truncated prefix recovers the start
    let reverse = reverse_sweep(profile, resources, dbseq, weight_gap_o, weight_gap_e, forward_strand, &forward, use_16bit);

    debug_assert!(forward.on_query >= reverse.on_query && forward.on_dbseq >= reverse.on_dbseq);
    LocalAlignmentCoordinates {
        ustart:           forward.on_query - reverse.on_query,
        usubstringlength: 1 + reverse.on_query,
        vstart:           reverse.on_dbseq,
        vsubstringlength: 1 + forward.on_dbseq - reverse.on_dbseq,
        raw_score:        u32::from(forward.score),
        forward_strand,
    }
}

#[allow(clippy::too_many_arguments)]
fn reverse_sweep(
    profile: &SswProfile<'_>, resources: &mut SswResources, dbseq: &[u8], weight_gap_o: u8, weight_gap_e: u8,
    forward_strand: bool, forward: &SwSimdResult, use_16bit: bool,
) -> SwSimdResult {
    let prefix_len = forward.on_query + 1;
    let query_prefix = &profile.query[..prefix_len];
    let sweep_len = forward.on_dbseq + 1;

    if !use_16bit {
        let reversed = seq_profile_u8(profile.scheme, profile.abs_smallest_score, query_prefix, true);
        match sw_simd_u8(
            dbseq,
            sweep_len,
            prefix_len,
            weight_gap_o,
            weight_gap_e,
            &reversed,
            forward.score as u8,
            profile.abs_smallest_score,
            false,
            forward_strand,
            resources.vectors8(segment_len(prefix_len, LANES_U8)),
        ) {
            KernelOutcome::Done(result) => return result,
            KernelOutcome::Overflow => {}
        }
    }
    let reversed = seq_profile_i16(profile.scheme, query_prefix, true);
    sw_simd_i16(
        dbseq,
        sweep_len,
        prefix_len,
        weight_gap_o,
        weight_gap_e,
        &reversed,
        forward.score,
        false,
        forward_strand,
        resources.vectors16(segment_len(prefix_len, LANES_I16)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::matrices::{UNIT_SCORE_NUC, UNIT_SCORE_NUC_2_2};
    use crate::seq::alphabet::complement;

    fn encode(seq: &[u8]) -> Vec<u8> {
        let table = UNIT_SCORE_NUC.encoding();
        seq.iter().map(|&c| table[usize::from(c)]).collect()
    }

    fn rc(seq: &[u8]) -> Vec<u8> {
        seq.iter().rev().map(|&c| complement(c)).collect()
    }

    fn align(scheme: &'static ScoreScheme, u: &[u8], v: &[u8], gap_open: u8, gap_extend: u8) -> LocalAlignmentCoordinates {
        let u = encode(u);
        let v = encode(v);
        let profile = SswProfile::new(scheme, &u);
        let mut resources = SswResources::new(u.len().max(v.len()));
        ssw_align(&profile, &mut resources, &v, gap_open + gap_extend, gap_extend, false, true)
    }

    #[test]
    fn identical_sequences_cover_everything() {
        let coords = align(&UNIT_SCORE_NUC, b"ACGTACGT", b"ACGTACGT", 11, 1);
        assert_eq!(
            coords,
            LocalAlignmentCoordinates {
                ustart:           0,
                usubstringlength: 8,
                vstart:           0,
                vsubstringlength: 8,
                raw_score:        16,
                forward_strand:   true,
            }
        );
    }

    #[test]
    fn embedded_motif_gets_exact_coordinates() {
        let coords = align(&UNIT_SCORE_NUC, b"ACGT", b"TTACGTTT", 11, 1);
        assert_eq!(coords.raw_score, 8);
        assert_eq!((coords.ustart, coords.usubstringlength), (0, 4));
        assert_eq!((coords.vstart, coords.vsubstringlength), (2, 4));
    }

    #[test]
    fn local_alignment_prefers_blocks_over_costly_gaps() {
        // bridging the CCC block would score 12 - (4 + 3 * 2) = 2, the bare
        // AAA block scores 6
        let coords = align(&UNIT_SCORE_NUC_2_2, b"AAAGGG", b"AAACCCGGG", 4, 2);
        assert_eq!(coords.raw_score, 6);
        assert_eq!((coords.ustart, coords.usubstringlength), (0, 3));
        assert_eq!((coords.vstart, coords.vsubstringlength), (0, 3));
    }

    #[test]
    fn compute_only_end_reports_end_positions() {
        let u = encode(b"ACGT");
        let v = encode(b"TTACGTTT");
        let profile = SswProfile::new(&UNIT_SCORE_NUC, &u);
        let mut resources = SswResources::new(8);
        let coords = ssw_align(&profile, &mut resources, &v, 12, 1, true, true);
        assert_eq!(coords.raw_score, 8);
        assert_eq!((coords.ustart, coords.vstart), (3, 5));
        assert_eq!((coords.usubstringlength, coords.vsubstringlength), (0, 0));
    }

    #[test]
    fn saturated_8bit_pass_reruns_in_16bit() {
        let seq = vec![b'A'; 300];
        let coords = align(&UNIT_SCORE_NUC, &seq, &seq, 11, 1);
        assert_eq!(coords.raw_score, 600);
        assert_eq!((coords.ustart, coords.usubstringlength), (0, 300));
        assert_eq!((coords.vstart, coords.vsubstringlength), (0, 300));
    }

    #[test]
    fn eight_and_sixteen_bit_kernels_agree_below_saturation() {
        let u = encode(b"ACGTACGTTGCAACGTTTTTACGT");
        let v = encode(b"GGACGTACGATGCAACGTATTTTACGTGG");
        let profile = SswProfile::new(&UNIT_SCORE_NUC, &u);
        let mut resources = SswResources::new(u.len().max(v.len()));

        let eight = match sw_simd_u8(
            &v,
            v.len(),
            u.len(),
            12,
            1,
            &profile.profile_u8,
            0,
            profile.abs_smallest_score,
            true,
            true,
            resources.vectors8(segment_len(u.len(), LANES_U8)),
        ) {
            KernelOutcome::Done(result) => result,
            KernelOutcome::Overflow => panic!("unexpected overflow"),
        };
        let sixteen = sw_simd_i16(
            &v,
            v.len(),
            u.len(),
            12,
            1,
            &profile.profile_i16,
            0,
            true,
            true,
            resources.vectors16(segment_len(u.len(), LANES_I16)),
        );
        assert_eq!(eight, sixteen);
        assert!(eight.score > 0);
    }

    #[test]
    fn reverse_complement_alignment_is_symmetric() {
        let u = encode(b"ACGTTGCATT");
        let v = encode(b"TTGCAACGTACGT");
        let mut resources = SswResources::new(u.len().max(v.len()));

        // u against rc(v) via the strand flag
        let profile_u = SswProfile::new(&UNIT_SCORE_NUC, &u);
        let on_rc = ssw_align(&profile_u, &mut resources, &v, 12, 1, false, false);

        // rc(u) against v on the forward strand
        let u_rc = rc(&u);
        let profile_rc = SswProfile::new(&UNIT_SCORE_NUC, &u_rc);
        let forward = ssw_align(&profile_rc, &mut resources, &v, 12, 1, false, true);

        assert_eq!(on_rc.raw_score, forward.raw_score);
        assert!(on_rc.raw_score > 0);
        assert!(!on_rc.forward_strand);
    }

    #[test]
    fn reverse_strand_hit_on_a_palindromic_pair() {
        // rc(ACGTACGT) == ACGTACGT, so both strands score the full 16
        let coords_fwd = align(&UNIT_SCORE_NUC, b"ACGTACGT", b"ACGTACGT", 11, 1);
        let u = encode(b"ACGTACGT");
        let v = encode(b"ACGTACGT");
        let profile = SswProfile::new(&UNIT_SCORE_NUC, &u);
        let mut resources = SswResources::new(8);
        let coords_rev = ssw_align(&profile, &mut resources, &v, 12, 1, false, false);
        assert_eq!(coords_fwd.raw_score, 16);
        assert_eq!(coords_rev.raw_score, 16);
        assert_eq!(coords_rev.vstart_forward(8), 0);
    }
}
