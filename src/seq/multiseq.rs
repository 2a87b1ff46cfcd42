//! An in-memory multi-sequence container backed by one contiguous buffer.
//!
//! All sequences of a FASTA file (plain or gzip compressed) are concatenated
//! into a single allocation, each followed by a [`PADDING`] sentinel byte.
//! Headers live in a second contiguous buffer. After construction the
//! container is encoded once into alphabet ranks and never mutated again.

use crate::{
    SwError, SwResult,
    seq::alphabet::{PADDING, looks_like_dna},
};
use flate2::read::MultiGzDecoder;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

/// How many leading sequence bytes to sample for alphabet detection.
const ALPHABET_SAMPLE: usize = 10_000;

/// A read-only multi-sequence container.
pub struct MultiSeq {
    /// Concatenated sequence bytes; a [`PADDING`] byte follows each sequence.
    seq_buffer:     Vec<u8>,
    /// `sequences_number() + 1` offsets into `seq_buffer`; sequence `i`
    /// occupies `seq_offsets[i]..seq_offsets[i + 1] - 1`.
    seq_offsets:    Vec<usize>,
    /// Concatenated header lines without the leading `>`.
    header_buffer:  Vec<u8>,
    header_offsets: Vec<usize>,
    max_length:     usize,
}

impl MultiSeq {
    /// Reads a FASTA file, transparently decoding gzip input (decided by the
    /// `.gz`/`.gzip` extension).
    pub fn from_path(path: &Path) -> SwResult<Self> {
        let file = File::open(path).map_err(|e| SwError::open_failure(path, e))?;
        let is_gz = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip"));
        if is_gz {
            Self::from_reader(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Self::from_reader(BufReader::new(file))
        }
    }

    /// Parses FASTA records from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: BufReader<R>) -> SwResult<Self> {
        let mut seq_buffer = Vec::new();
        let mut seq_offsets = vec![0];
        let mut header_buffer = Vec::new();
        let mut header_offsets = vec![0];
        let mut in_record = false;

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('>') {
                if in_record {
                    seq_buffer.push(PADDING);
                    seq_offsets.push(seq_buffer.len());
                }
                header_buffer.extend_from_slice(header.as_bytes());
                header_offsets.push(header_buffer.len());
                in_record = true;
            } else {
                if !in_record {
                    return Err(SwError::InvalidArgument(
                        "sequence data before the first FASTA header".to_string(),
                    ));
                }
                seq_buffer.extend(line.bytes().filter(|c| !c.is_ascii_whitespace()));
            }
        }
        if !in_record {
            return Err(SwError::InvalidArgument("input contains no FASTA records".to_string()));
        }
        seq_buffer.push(PADDING);
        seq_offsets.push(seq_buffer.len());

        if seq_offsets.windows(2).any(|pair| pair[1] - pair[0] < 2) {
            return Err(SwError::InvalidArgument(
                "input contains a FASTA record without sequence data".to_string(),
            ));
        }

        let mut multiseq = Self {
            seq_buffer,
            seq_offsets,
            header_buffer,
            header_offsets,
            max_length: 0,
        };
        multiseq.max_length = (0..multiseq.sequences_number())
            .map(|i| multiseq.sequence_length(i))
            .max()
            .unwrap_or(0);
        Ok(multiseq)
    }

    #[inline]
    #[must_use]
    pub fn sequences_number(&self) -> usize {
        self.seq_offsets.len() - 1
    }

    /// Length of sequence `seqnum`, excluding the padding sentinel.
    #[inline]
    #[must_use]
    pub fn sequence_length(&self, seqnum: usize) -> usize {
        self.seq_offsets[seqnum + 1] - self.seq_offsets[seqnum] - 1
    }

    /// The encoded bytes of sequence `seqnum`, excluding the padding
    /// sentinel.
    #[inline]
    #[must_use]
    pub fn sequence(&self, seqnum: usize) -> &[u8] {
        &self.seq_buffer[self.seq_offsets[seqnum]..self.seq_offsets[seqnum + 1] - 1]
    }

    #[inline]
    #[must_use]
    pub fn maximum_sequence_length(&self) -> usize {
        self.max_length
    }

    #[must_use]
    pub fn header(&self, seqnum: usize) -> &str {
        let bytes = &self.header_buffer[self.header_offsets[seqnum]..self.header_offsets[seqnum + 1]];
        str::from_utf8(bytes).unwrap_or("")
    }

    /// The header prefix up to (excluding) the first whitespace character.
    #[must_use]
    pub fn short_header(&self, seqnum: usize) -> &str {
        let header = self.header(seqnum);
        header
            .split_once(|c: char| c.is_whitespace())
            .map_or(header, |(short, _)| short)
    }

    /// Translates every sequence byte through `table` in place. Padding
    /// sentinels are left untouched.
    pub fn encode_with(&mut self, table: &[u8; 256]) {
        for seqnum in 0..self.sequences_number() {
            let range = self.seq_offsets[seqnum]..self.seq_offsets[seqnum + 1] - 1;
            for byte in &mut self.seq_buffer[range] {
                *byte = table[usize::from(*byte)];
            }
        }
    }

    /// Samples the raw (pre-encoding) sequence bytes for alphabet detection.
    #[must_use]
    pub fn looks_like_dna(&self) -> bool {
        let sample_len = self.seq_buffer.len().min(ALPHABET_SAMPLE);
        let sample: Vec<u8> = self.seq_buffer[..sample_len]
            .iter()
            .copied()
            .filter(|&c| c != PADDING)
            .collect();
        looks_like_dna(&sample)
    }
}

/// The database/query pair of containers. When no query file is given, both
/// sides refer to the same container and all-against-all comparison runs on
/// the upper triangle only.
pub struct MultiSeqPair {
    db:    MultiSeq,
    query: Option<MultiSeq>,
}

impl MultiSeqPair {
    /// Loads the database file and, if distinct, the query file.
    pub fn load(db_path: &PathBuf, query_path: Option<&PathBuf>) -> SwResult<Self> {
        let db = MultiSeq::from_path(db_path)?;
        let query = match query_path {
            Some(path) if path != db_path => Some(MultiSeq::from_path(path)?),
            _ => None,
        };
        Ok(Self { db, query })
    }

    /// Builds a pair from already constructed containers; `None` for the
    /// query marks a self-comparison.
    #[must_use]
    pub fn from_parts(db: MultiSeq, query: Option<MultiSeq>) -> Self {
        Self { db, query }
    }

    #[inline]
    #[must_use]
    pub fn db(&self) -> &MultiSeq {
        &self.db
    }

    #[inline]
    #[must_use]
    pub fn query(&self) -> &MultiSeq {
        self.query.as_ref().unwrap_or(&self.db)
    }

    /// True when database and query are the same container.
    #[inline]
    #[must_use]
    pub fn same(&self) -> bool {
        self.query.is_none()
    }

    #[must_use]
    pub fn looks_like_dna(&self) -> bool {
        self.db.looks_like_dna() && self.query.as_ref().is_none_or(MultiSeq::looks_like_dna)
    }

    pub fn encode_with(&mut self, table: &[u8; 256]) {
        self.db.encode_with(table);
        if let Some(query) = &mut self.query {
            query.encode_with(table);
        }
    }

    #[must_use]
    pub fn maximum_sequence_length(&self) -> usize {
        self.db
            .maximum_sequence_length()
            .max(self.query.as_ref().map_or(0, MultiSeq::maximum_sequence_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn from_str(fasta: &str) -> MultiSeq {
        MultiSeq::from_reader(BufReader::new(Cursor::new(fasta.to_string()))).unwrap()
    }

    #[test]
    fn parses_records_and_headers() {
        let ms = from_str(">seq1 first record\nACGT\nACGT\n>seq2\nTTT\n");
        assert_eq!(ms.sequences_number(), 2);
        assert_eq!(ms.sequence_length(0), 8);
        assert_eq!(ms.sequence(0), b"ACGTACGT");
        assert_eq!(ms.sequence(1), b"TTT");
        assert_eq!(ms.maximum_sequence_length(), 8);
        assert_eq!(ms.header(0), "seq1 first record");
        assert_eq!(ms.short_header(0), "seq1");
        assert_eq!(ms.short_header(1), "seq2");
    }

    #[test]
    fn sequences_are_sentinel_separated() {
        let ms = from_str(">a\nAC\n>b\nGT\n");
        assert_eq!(ms.seq_buffer[2], PADDING);
        assert_eq!(ms.seq_buffer[5], PADDING);
    }

    #[test]
    fn encoding_translates_in_place() {
        let mut ms = from_str(">a\nACGTN\n");
        let table = crate::seq::alphabet::encode_table("Aa|Cc|Gg|TtUu|N", 5);
        ms.encode_with(&table);
        assert_eq!(ms.sequence(0), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_input_is_an_error() {
        let result = MultiSeq::from_reader(BufReader::new(Cursor::new(String::new())));
        assert!(result.is_err());
    }
}
