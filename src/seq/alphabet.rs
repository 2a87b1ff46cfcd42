//! Rank encoding of sequence characters.
//!
//! Aligners never see raw characters: every sequence is translated into
//! ranks `0..alphabet_size` before use. The translation is driven by a
//! `character_spec` grammar: groups of characters separated by `|`, where
//! every character in group `g` maps to rank `g`. Characters outside the
//! spec map to the wildcard rank `alphabet_size - 1`.

/// The sentinel byte written after every encoded sequence. Distinct from all
/// valid ranks, so an aligner running past a sequence end cannot produce a
/// spurious match.
pub const PADDING: u8 = u8::MAX;

/// Complement of an encoded nucleotide. The first four ranks are A, C, G, T;
/// the wildcard rank is its own complement.
#[inline]
#[must_use]
pub fn complement(code: u8) -> u8 {
    if code < 4 { 3 - code } else { code }
}

/// Builds the 256-entry translation table for a `character_spec`.
///
/// Characters not mentioned in the spec (including lowercase forms, unless
/// the spec lists them) are assigned the wildcard rank `alphabet_size - 1`.
#[must_use]
pub fn encode_table(character_spec: &str, alphabet_size: usize) -> [u8; 256] {
    debug_assert!(alphabet_size > 0 && alphabet_size <= usize::from(u8::MAX));
    let wildcard = (alphabet_size - 1) as u8;
    let mut table = [wildcard; 256];
    for (rank, group) in character_spec.split('|').enumerate() {
        debug_assert!(rank < alphabet_size);
        for ch in group.bytes() {
            table[usize::from(ch)] = rank as u8;
        }
    }
    table
}

/// Heuristic alphabet detection: a sequence sample dominated by nucleotide
/// characters is treated as DNA.
#[must_use]
pub fn looks_like_dna(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    let nuc = sample
        .iter()
        .filter(|&&c| matches!(c, b'A' | b'C' | b'G' | b'T' | b'U' | b'N' | b'a' | b'c' | b'g' | b't' | b'u' | b'n'))
        .count();
    nuc * 10 >= sample.len() * 9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_table_groups_and_wildcard() {
        let table = encode_table("Aa|Cc|Gg|TtUu|NSYWRKVBDHMnsywrkvbdhm", 5);
        assert_eq!(table[usize::from(b'A')], 0);
        assert_eq!(table[usize::from(b'a')], 0);
        assert_eq!(table[usize::from(b'U')], 3);
        assert_eq!(table[usize::from(b'S')], 4);
        // not in the spec at all
        assert_eq!(table[usize::from(b'-')], 4);
    }

    #[test]
    fn complement_is_involution_on_nucleotides() {
        for code in 0u8..4 {
            assert_eq!(complement(complement(code)), code);
        }
        assert_eq!(complement(4), 4);
    }

    #[test]
    fn dna_detection() {
        assert!(looks_like_dna(b"ACGTACGTACGTNNNacgt"));
        assert!(!looks_like_dna(b"MKVLWAALLVTFLAGCQA"));
    }
}
