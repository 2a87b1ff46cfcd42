//! The striped Smith-Waterman sweep kernels.
//!
//! Both kernels process one database character per iteration against the
//! whole striped query profile, maintaining H (replacement), E (gaps on the
//! database side) and an Hmax snapshot of the best column. The deletion
//! score F is carried across segments by the lazy-F correction loop.
//!
//! The 8-bit kernel works on bias-shifted unsigned scores and reports
//! saturation so the caller can rerun in 16 bits; the 16-bit kernel works on
//! exact signed scores.

use crate::seq::alphabet::complement;
use std::{
    mem,
    simd::{
        Simd,
        cmp::{SimdOrd, SimdPartialOrd},
        num::{SimdInt, SimdUint},
    },
};

/// Lanes of a 256-bit register holding 8-bit scores.
pub const LANES_U8: usize = 32;
/// Lanes of a 256-bit register holding 16-bit scores.
pub const LANES_I16: usize = 16;

pub(crate) type V8 = Simd<u8, LANES_U8>;
pub(crate) type V16 = Simd<i16, LANES_I16>;

/// Number of vectors a striped profile needs per alphabet character.
#[inline]
#[must_use]
pub fn segment_len(seq_len: usize, lanes: usize) -> usize {
    seq_len.div_ceil(lanes)
}

/// End coordinates and score of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SwSimdResult {
    /// Position of the maximum on the swept (database) sequence, in the
    /// coordinates of the requested reading direction and strand.
    pub on_dbseq: usize,
    /// Position of the maximum on the profile (query) sequence.
    pub on_query: usize,
    pub score:    u16,
}

/// Outcome of a sweep: either a result, or saturation of the 8-bit range.
pub(crate) enum KernelOutcome {
    Done(SwSimdResult),
    Overflow,
}

/// Fetches the database character for sweep position `j`, honouring reading
/// direction and strand.
#[inline]
fn db_char(dbseq: &[u8], sweep_len: usize, j: usize, forward_reading: bool, forward_strand: bool) -> (usize, u8) {
    let pos = if forward_reading { j } else { sweep_len - 1 - j };
    let code = if forward_strand {
        dbseq[pos]
    } else {
        complement(dbseq[dbseq.len() - 1 - pos])
    };
    (pos, code)
}

/// 8-bit striped sweep over `sweep_len` database positions.
///
/// `weight_gap_o` must already include the extension cost of the first gap
/// character. `expected_score` of zero sweeps everything; a non-zero value
/// stops the sweep as soon as some lane reaches it (used by the reverse
/// pass). `vectors` provides `4 * segment_len` zeroed working registers.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sw_simd_u8(
    dbseq: &[u8], sweep_len: usize, query_len: usize, weight_gap_o: u8, weight_gap_e: u8, profile: &[V8],
    expected_score: u8, bias: u8, forward_reading: bool, forward_strand: bool, vectors: &mut [V8],
) -> KernelOutcome {
    let seg_len = segment_len(query_len, LANES_U8);
    debug_assert!(query_len > 0 && vectors.len() >= 4 * seg_len);
    let (h_a, rest) = vectors.split_at_mut(seg_len);
    let (h_b, rest) = rest.split_at_mut(seg_len);
    let (e_arr, rest) = rest.split_at_mut(seg_len);
    let hmax = &mut rest[..seg_len];
    let (mut h_load, mut h_store) = (h_a, h_b);

    let v_gap_o = V8::splat(weight_gap_o);
    let v_gap_e = V8::splat(weight_gap_e);
    let v_bias = V8::splat(bias);
    let zero = V8::splat(0);

    let mut max_score = 0u8;
    let mut end_dbseq = 0usize;

    for j in 0..sweep_len {
        let (pos, code) = db_char(dbseq, sweep_len, j, forward_reading, forward_strand);
        let prof = &profile[usize::from(code) * seg_len..][..seg_len];

        let mut v_f = zero;
        let mut v_h = h_store[seg_len - 1].shift_elements_right::<1>(0);
        mem::swap(&mut h_load, &mut h_store);
        let mut v_max_column = zero;

        for i in 0..seg_len {
            v_h = v_h.saturating_add(prof[i]).saturating_sub(v_bias);
            let v_e = e_arr[i];
            v_h = v_h.simd_max(v_e).simd_max(v_f);
            v_max_column = v_max_column.simd_max(v_h);
            h_store[i] = v_h;

            let v_h_gap = v_h.saturating_sub(v_gap_o);
            e_arr[i] = v_e.saturating_sub(v_gap_e).simd_max(v_h_gap);
            v_f = v_f.saturating_sub(v_gap_e).simd_max(v_h_gap);
            v_h = h_load[i];
        }

        // lazy-F: re-propagate the deletion score across the stripe boundary
        'lazy_f: for _ in 0..LANES_U8 {
            v_f = v_f.shift_elements_right::<1>(0);
            for i in 0..seg_len {
                let v_h = h_store[i].simd_max(v_f);
                h_store[i] = v_h;
                v_max_column = v_max_column.simd_max(v_h);
                let v_h_gap = v_h.saturating_sub(v_gap_o);
                v_f = v_f.saturating_sub(v_gap_e);
                if !v_f.simd_gt(v_h_gap).any() {
                    break 'lazy_f;
                }
            }
        }

        let column_max = v_max_column.reduce_max();
        if column_max > max_score {
            max_score = column_max;
            end_dbseq = pos;
            hmax.copy_from_slice(h_store);
            if expected_score > 0 && max_score >= expected_score {
                break;
            }
        }
    }

    if u16::from(max_score) + u16::from(bias) >= u16::from(u8::MAX) {
        return KernelOutcome::Overflow;
    }

    KernelOutcome::Done(SwSimdResult {
        on_dbseq: end_dbseq,
        on_query: scan_hmax_u8(hmax, max_score, query_len, seg_len),
        score:    u16::from(max_score),
    })
}

/// Finds the smallest query position whose Hmax lane holds the maximum.
fn scan_hmax_u8(hmax: &[V8], max_score: u8, query_len: usize, seg_len: usize) -> usize {
    for lane in 0..LANES_U8 {
        for (i, vector) in hmax.iter().enumerate() {
            let pos = lane * seg_len + i;
            if pos < query_len && vector.as_array()[lane] == max_score {
                return pos;
            }
        }
    }
    0
}

/// 16-bit striped sweep; signed exact scores, no bias.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sw_simd_i16(
    dbseq: &[u8], sweep_len: usize, query_len: usize, weight_gap_o: u8, weight_gap_e: u8, profile: &[V16],
    expected_score: u16, forward_reading: bool, forward_strand: bool, vectors: &mut [V16],
) -> SwSimdResult {
    let seg_len = segment_len(query_len, LANES_I16);
    debug_assert!(query_len > 0 && vectors.len() >= 4 * seg_len);
    let (h_a, rest) = vectors.split_at_mut(seg_len);
    let (h_b, rest) = rest.split_at_mut(seg_len);
    let (e_arr, rest) = rest.split_at_mut(seg_len);
    let hmax = &mut rest[..seg_len];
    let (mut h_load, mut h_store) = (h_a, h_b);

    let v_gap_o = V16::splat(i16::from(weight_gap_o));
    let v_gap_e = V16::splat(i16::from(weight_gap_e));
    let zero = V16::splat(0);

    let mut max_score = 0i16;
    let mut end_dbseq = 0usize;

    for j in 0..sweep_len {
        let (pos, code) = db_char(dbseq, sweep_len, j, forward_reading, forward_strand);
        let prof = &profile[usize::from(code) * seg_len..][..seg_len];

        let mut v_f = zero;
        let mut v_h = h_store[seg_len - 1].shift_elements_right::<1>(0);
        mem::swap(&mut h_load, &mut h_store);
        let mut v_max_column = zero;

        for i in 0..seg_len {
            v_h = v_h.saturating_add(prof[i]);
            let v_e = e_arr[i];
            v_h = v_h.simd_max(v_e).simd_max(v_f).simd_max(zero);
            v_max_column = v_max_column.simd_max(v_h);
            h_store[i] = v_h;

            let v_h_gap = v_h.saturating_sub(v_gap_o).simd_max(zero);
            e_arr[i] = v_e.saturating_sub(v_gap_e).simd_max(v_h_gap).simd_max(zero);
            v_f = v_f.saturating_sub(v_gap_e).simd_max(v_h_gap).simd_max(zero);
            v_h = h_load[i];
        }

        'lazy_f: for _ in 0..LANES_I16 {
            v_f = v_f.shift_elements_right::<1>(0);
            for i in 0..seg_len {
                let v_h = h_store[i].simd_max(v_f);
                h_store[i] = v_h;
                v_max_column = v_max_column.simd_max(v_h);
                let v_h_gap = v_h.saturating_sub(v_gap_o).simd_max(zero);
                v_f = v_f.saturating_sub(v_gap_e);
                if !v_f.simd_gt(v_h_gap).any() {
                    break 'lazy_f;
                }
            }
        }

        let column_max = v_max_column.reduce_max();
        if column_max > max_score {
            max_score = column_max;
            end_dbseq = pos;
            hmax.copy_from_slice(h_store);
            if expected_score > 0 && max_score as u16 >= expected_score {
                break;
            }
        }
    }

    debug_assert!(max_score < i16::MAX, "16-bit sweep saturated");

    SwSimdResult {
        on_dbseq: end_dbseq,
        on_query: scan_hmax_i16(hmax, max_score, query_len, seg_len),
        score:    max_score as u16,
    }
}

fn scan_hmax_i16(hmax: &[V16], max_score: i16, query_len: usize, seg_len: usize) -> usize {
    for lane in 0..LANES_I16 {
        for (i, vector) in hmax.iter().enumerate() {
            let pos = lane * seg_len + i;
            if pos < query_len && vector.as_array()[lane] == max_score {
                return pos;
            }
        }
    }
    0
}
