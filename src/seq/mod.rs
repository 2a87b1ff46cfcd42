//! Sequence containers and the rank encoding shared by all aligners.

pub mod alphabet;
pub mod multiseq;
pub mod substring;

pub use alphabet::{PADDING, complement, encode_table};
pub use multiseq::{MultiSeq, MultiSeqPair};
pub use substring::EncodedSubstring;
