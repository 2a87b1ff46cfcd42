//! A strand-aware view into an encoded sequence.

use crate::seq::alphabet::complement;

/// A substring of an encoded sequence, optionally read as the reverse
/// complement of the forward strand.
///
/// For a reverse-strand view, `start` and `len` are coordinates on the
/// reverse complement; indexing synthesises the complemented characters on
/// the fly from the stored forward-strand bytes, so no copy of the reverse
/// complement is ever materialised.
#[derive(Clone, Copy)]
pub struct EncodedSubstring<'a> {
    forward_strand: bool,
    seq:            &'a [u8],
    start:          usize,
    len:            usize,
}

impl<'a> EncodedSubstring<'a> {
    /// A forward-strand substring `seq[start..start + len]`.
    #[inline]
    #[must_use]
    pub fn new(seq: &'a [u8], start: usize, len: usize) -> Self {
        debug_assert!(start + len <= seq.len());
        Self {
            forward_strand: true,
            seq,
            start,
            len,
        }
    }

    /// A substring on either strand. `seq` always holds the forward-strand
    /// bytes of the complete sequence.
    #[inline]
    #[must_use]
    pub fn new_stranded(forward_strand: bool, seq: &'a [u8], start: usize, len: usize) -> Self {
        debug_assert!(start + len <= seq.len());
        Self {
            forward_strand,
            seq,
            start,
            len,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, idx: usize) -> u8 {
        debug_assert!(idx < self.len);
        if self.forward_strand {
            self.seq[self.start + idx]
        } else {
            let transformed_end = self.seq.len() - 1 - self.start;
            complement(self.seq[transformed_end - idx])
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn is_forward(&self) -> bool {
        self.forward_strand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_view() {
        let seq = [0u8, 1, 2, 3, 0];
        let sub = EncodedSubstring::new(&seq, 1, 3);
        assert_eq!((sub.get(0), sub.get(1), sub.get(2)), (1, 2, 3));
    }

    #[test]
    fn reverse_view_complements_from_the_end() {
        // forward ACGT; its reverse complement is ACGT as well
        let seq = [0u8, 1, 2, 3];
        let sub = EncodedSubstring::new_stranded(false, &seq, 0, 4);
        assert_eq!(
            (0..4).map(|i| sub.get(i)).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );

        // forward AAGT -> reverse complement ACTT
        let seq = [0u8, 0, 2, 3];
        let sub = EncodedSubstring::new_stranded(false, &seq, 0, 4);
        assert_eq!(
            (0..4).map(|i| sub.get(i)).collect::<Vec<_>>(),
            vec![0, 1, 3, 3]
        );
    }

    #[test]
    fn reverse_view_with_offset() {
        // forward TTAC, reverse complement GTAA, window [1..3) = TA
        let seq = [3u8, 3, 0, 1];
        let sub = EncodedSubstring::new_stranded(false, &seq, 1, 2);
        assert_eq!((sub.get(0), sub.get(1)), (3, 0));
    }
}
