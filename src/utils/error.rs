//! The error type shared by all of swalign's fallible boundaries.
//!
//! Algorithmic invariants inside the aligners are programmer errors and are
//! checked with `debug_assert!` rather than surfaced here.

use std::path::PathBuf;
use thiserror::Error;

/// A [`Result`] alias using [`SwError`].
pub type SwResult<T> = Result<T, SwError>;

/// The failures that can reach the top-level driver. Each renders as a
/// one-line message suitable for `swalign: <message>` on stderr.
#[derive(Debug, Error)]
pub enum SwError {
    /// Command line misuse that clap cannot detect on its own, such as
    /// conflicting or out-of-range option combinations.
    #[error("{0}")]
    InvalidArgument(String),

    /// A score matrix was named that does not exist for the detected
    /// alphabet.
    #[error("score matrix {name} is not possible for {alphabet} sequences; the following choices are available: {choices}")]
    UnsupportedMatrix {
        name:     String,
        alphabet: &'static str,
        choices:  String,
    },

    /// Bit scores were requested but no Karlin-Altschul parameters exist for
    /// the chosen gap costs.
    #[error(
        "no Gumbel parameters for computing bit scores available for blosum62 matrix and gap parameters {gap_open}/{gap_extend}"
    )]
    MissingStatistics { gap_open: i8, gap_extend: i8 },

    /// A file could not be opened or created.
    #[error("cannot open file \"{path}\": {source}")]
    FileOpen {
        path:   PathBuf,
        source: std::io::Error,
    },

    /// Any other I/O failure at a boundary.
    #[error("{0}")]
    FileIo(#[from] std::io::Error),

    /// A CIGAR string contained an operator character outside `MIDX=`.
    #[error("illegal symbol '{0}' in cigar string")]
    MalformedCigar(char),

    /// The pair-restriction file was given but contained no usable pairs.
    #[error("file specified with option -r cannot be empty")]
    EmptyRestrictFile,

    /// An internal consistency check failed in a release build.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwError {
    /// Attaches a path to a raw I/O error, producing [`SwError::FileOpen`].
    pub fn open_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SwError::FileOpen {
            path: path.into(),
            source,
        }
    }
}
