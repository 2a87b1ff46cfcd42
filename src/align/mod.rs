//! Pairwise alignment: transcript encoding, banded affine DP, striped SIMD
//! Smith-Waterman, score matrices and BLAST statistics.

pub mod banded;
pub mod blast_stat;
pub mod coords;
pub mod eoplist;
pub mod matrices;
pub mod ssw;

pub use banded::DiagonalBandAligner;
pub use blast_stat::BlastStatistics;
pub use coords::{LocalAlignmentCoordinates, StoredMatch};
pub use eoplist::{CigarOperator, EopType, Eoplist};
pub use matrices::ScoreScheme;
