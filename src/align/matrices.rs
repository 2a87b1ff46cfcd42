//! Named score matrices and their alphabets.
//!
//! Every scheme bundles the score table with the character alphabet it is
//! defined over: `characters` maps ranks back to display characters, and
//! `character_spec` drives the encoding pass (groups separated by `|`; each
//! character of group `g` encodes as rank `g`; anything else becomes the
//! wildcard rank `alphabet_size - 1`).

use crate::{SwError, SwResult, seq::alphabet::encode_table};

/// A score matrix together with its alphabet.
pub struct ScoreScheme {
    pub name:           &'static str,
    /// Rank-to-character map, one character per rank.
    pub characters:     &'static str,
    /// Encoding groups, `|`-separated, one group per rank.
    pub character_spec: &'static str,
    pub alphabet_size:  usize,
    /// Row-major `alphabet_size * alphabet_size` score table.
    pub scores:         &'static [i8],
    pub smallest_score: i8,
    pub dna:            bool,
}

impl ScoreScheme {
    #[inline]
    #[must_use]
    pub fn score(&self, a: u8, b: u8) -> i8 {
        self.scores[usize::from(a) * self.alphabet_size + usize::from(b)]
    }

    /// The score row for character `c`, indexed by the second character.
    #[inline]
    #[must_use]
    pub fn row(&self, c: u8) -> &[i8] {
        let start = usize::from(c) * self.alphabet_size;
        &self.scores[start..start + self.alphabet_size]
    }

    #[inline]
    #[must_use]
    pub fn to_char(&self, rank: u8) -> char {
        self.characters.as_bytes()[usize::from(rank)] as char
    }

    /// The 256-entry encoding table for this scheme's alphabet.
    #[must_use]
    pub fn encoding(&self) -> [u8; 256] {
        encode_table(self.character_spec, self.alphabet_size)
    }
}

const NUC_CHARACTERS: &str = "ACGTN";
const NUC_SPEC: &str = "Aa|Cc|Gg|TtUu|NSYWRKVBDHMnsywrkvbdhm";

#[rustfmt::skip]
static UNIT_NUC_SCORES: [i8; 25] = [
    /*        A   C   G   T   N */
    /* A */   2, -1, -1, -1, -1,
    /* C */  -1,  2, -1, -1, -1,
    /* G */  -1, -1,  2, -1, -1,
    /* T */  -1, -1, -1,  2, -1,
    /* N */  -1, -1, -1, -1, -1,
];

pub static UNIT_SCORE_NUC: ScoreScheme = ScoreScheme {
    name:           "unit_score_nuc",
    characters:     NUC_CHARACTERS,
    character_spec: NUC_SPEC,
    alphabet_size:  5,
    scores:         &UNIT_NUC_SCORES,
    smallest_score: -1,
    dna:            true,
};

#[rustfmt::skip]
static UNIT_NUC_2_2_SCORES: [i8; 25] = [
    /*        A   C   G   T   N */
    /* A */   2, -2, -2, -2, -2,
    /* C */  -2,  2, -2, -2, -2,
    /* G */  -2, -2,  2, -2, -2,
    /* T */  -2, -2, -2,  2, -2,
    /* N */  -2, -2, -2, -2, -2,
];

/// Score matrix corresponding to the affine cost function 0,4,6.2.
pub static UNIT_SCORE_NUC_2_2: ScoreScheme = ScoreScheme {
    name:           "unit_score_nuc_2_2",
    characters:     NUC_CHARACTERS,
    character_spec: NUC_SPEC,
    alphabet_size:  5,
    scores:         &UNIT_NUC_2_2_SCORES,
    smallest_score: -2,
    dna:            true,
};

pub static UNIT_SCORE_NUC_LOWER: ScoreScheme = ScoreScheme {
    name:           "unit_score_nuc_lower",
    characters:     "acgtn",
    character_spec: "a|c|g|t|n",
    alphabet_size:  5,
    scores:         &UNIT_NUC_SCORES,
    smallest_score: -1,
    dna:            true,
};

pub static UNIT_SCORE_NUC_UPPER: ScoreScheme = ScoreScheme {
    name:           "unit_score_nuc_upper",
    characters:     NUC_CHARACTERS,
    character_spec: "A|C|G|T|N",
    alphabet_size:  5,
    scores:         &UNIT_NUC_SCORES,
    smallest_score: -1,
    dna:            true,
};

/// Protein alphabet: the 20 amino acids in BLAST order plus an `X` wildcard
/// rank absorbing ambiguity codes.
const AA_CHARACTERS: &str = "ARNDCQEGHILKMFPSTWYVX";
const AA_SPEC: &str =
    "Aa|Rr|Nn|Dd|Cc|Qq|Ee|Gg|Hh|Ii|Ll|Kk|Mm|Ff|Pp|Ss|Tt|Ww|Yy|Vv|XxBbZzJjUuOo*";
const AA_SIZE: usize = 21;

/// The standard BLOSUM62 table over the first 20 ranks.
#[rustfmt::skip]
const BLOSUM62_CORE: [[i8; 20]; 20] = [
    /*        A   R   N   D   C   Q   E   G   H   I   L   K   M   F   P   S   T   W   Y   V */
    /* A */ [ 4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0],
    /* R */ [-1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3],
    /* N */ [-2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3],
    /* D */ [-2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3],
    /* C */ [ 0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1],
    /* Q */ [-1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2],
    /* E */ [-1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2],
    /* G */ [ 0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3],
    /* H */ [-2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3],
    /* I */ [-1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3],
    /* L */ [-1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1],
    /* K */ [-1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2],
    /* M */ [-1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1],
    /* F */ [-2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1],
    /* P */ [-1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2],
    /* S */ [ 1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2],
    /* T */ [ 0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0],
    /* W */ [-3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3],
    /* Y */ [-2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1],
    /* V */ [ 0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4],
];

/// Embeds the 20x20 core into the 21-rank alphabet; the wildcard rank scores
/// -1 against everything, including itself.
const fn blosum62_with_wildcard() -> [i8; AA_SIZE * AA_SIZE] {
    let mut scores = [-1i8; AA_SIZE * AA_SIZE];
    let mut a = 0;
    while a < 20 {
        let mut b = 0;
        while b < 20 {
            scores[a * AA_SIZE + b] = BLOSUM62_CORE[a][b];
            b += 1;
        }
        a += 1;
    }
    scores
}

static BLOSUM62_SCORES: [i8; AA_SIZE * AA_SIZE] = blosum62_with_wildcard();

pub static BLOSUM62: ScoreScheme = ScoreScheme {
    name:           "blosum62",
    characters:     AA_CHARACTERS,
    character_spec: AA_SPEC,
    alphabet_size:  AA_SIZE,
    scores:         &BLOSUM62_SCORES,
    smallest_score: -4,
    dna:            false,
};

/// A unit matrix over the protein alphabet; the wildcard never matches.
const fn unit_aa() -> [i8; AA_SIZE * AA_SIZE] {
    let mut scores = [-1i8; AA_SIZE * AA_SIZE];
    let mut a = 0;
    while a < AA_SIZE - 1 {
        scores[a * AA_SIZE + a] = 2;
        a += 1;
    }
    scores
}

static UNIT_SCORE_AA_SCORES: [i8; AA_SIZE * AA_SIZE] = unit_aa();

pub static UNIT_SCORE_AA: ScoreScheme = ScoreScheme {
    name:           "unit_score_aa",
    characters:     AA_CHARACTERS,
    character_spec: AA_SPEC,
    alphabet_size:  AA_SIZE,
    scores:         &UNIT_SCORE_AA_SCORES,
    smallest_score: -1,
    dna:            false,
};

static DNA_SCHEMES: &[&ScoreScheme] = &[
    &UNIT_SCORE_NUC,
    &UNIT_SCORE_NUC_2_2,
    &UNIT_SCORE_NUC_LOWER,
    &UNIT_SCORE_NUC_UPPER,
];

static PROTEIN_SCHEMES: &[&ScoreScheme] = &[&BLOSUM62, &UNIT_SCORE_AA];

/// Selects a scheme by name for the detected alphabet. Without a name, DNA
/// input defaults to `unit_score_nuc` and protein input to `blosum62`.
///
/// ## Errors
///
/// [`SwError::UnsupportedMatrix`] when the name does not exist for the
/// alphabet, listing the valid choices.
pub fn scheme_from_name(name: Option<&str>, dna: bool) -> SwResult<&'static ScoreScheme> {
    let candidates = if dna { DNA_SCHEMES } else { PROTEIN_SCHEMES };
    match name {
        None => Ok(candidates[0]),
        Some(name) => candidates
            .iter()
            .find(|scheme| scheme.name == name)
            .copied()
            .ok_or_else(|| SwError::UnsupportedMatrix {
                name:     name.to_string(),
                alphabet: if dna { "DNA" } else { "protein" },
                choices:  candidates
                    .iter()
                    .map(|scheme| scheme.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blosum62_is_symmetric_with_expected_extremes() {
        for a in 0..AA_SIZE as u8 {
            for b in 0..AA_SIZE as u8 {
                assert_eq!(BLOSUM62.score(a, b), BLOSUM62.score(b, a));
            }
        }
        assert_eq!(BLOSUM62.score(17, 17), 11); // W/W
        assert_eq!(*BLOSUM62.scores.iter().min().unwrap(), BLOSUM62.smallest_score);
    }

    #[test]
    fn encoding_round_trips_through_characters() {
        let table = BLOSUM62.encoding();
        for (rank, cc) in BLOSUM62.characters.bytes().enumerate() {
            assert_eq!(usize::from(table[usize::from(cc)]), rank);
        }
        // ambiguity codes collapse onto the wildcard rank
        assert_eq!(table[usize::from(b'B')], (AA_SIZE - 1) as u8);
    }

    #[test]
    fn selection_by_name_and_default() {
        assert_eq!(scheme_from_name(None, true).unwrap().name, "unit_score_nuc");
        assert_eq!(scheme_from_name(None, false).unwrap().name, "blosum62");
        assert_eq!(
            scheme_from_name(Some("unit_score_nuc_2_2"), true).unwrap().name,
            "unit_score_nuc_2_2"
        );
        assert!(matches!(
            scheme_from_name(Some("blosum62"), true),
            Err(SwError::UnsupportedMatrix { .. })
        ));
    }
}
