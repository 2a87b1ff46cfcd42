//! Optional restriction of the comparison to an explicit set of pairs.

use crate::{SwError, SwResult, seq::MultiSeq};
use foldhash::{HashMap, HashMapExt, HashSet, HashSetExt};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// A set of (subject, query) sequence pairs the comparison is restricted
/// to. An empty set means no restriction.
pub struct PairRestriction {
    pairs: HashSet<(u32, u32)>,
}

impl PairRestriction {
    /// The unrestricted set.
    #[must_use]
    pub fn none() -> Self {
        Self { pairs: HashSet::new() }
    }

    /// Loads restriction pairs from `path`: one pair of sequence ids per
    /// line, tab separated, `#` comments allowed. Ids that are strings of
    /// digits are literal sequence indices; anything else is looked up among
    /// the short headers.
    pub fn from_file(path: &Path, db_multiseq: &MultiSeq, query_multiseq: &MultiSeq) -> SwResult<Self> {
        let db_header_ids = header_id_map(db_multiseq);
        let query_header_ids = if std::ptr::eq(db_multiseq, query_multiseq) {
            None
        } else {
            Some(header_id_map(query_multiseq))
        };

        let file = File::open(path).map_err(|e| SwError::open_failure(path, e))?;
        let mut pairs = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(db_id), Some(query_id)) = (fields.next(), fields.next()) else {
                return Err(SwError::InvalidArgument(format!(
                    "line \"{line}\" in pair restriction file does not contain two tab-separated ids"
                )));
            };
            let i = convert_header(&db_header_ids, db_id)?;
            let j = convert_header(query_header_ids.as_ref().unwrap_or(&db_header_ids), query_id)?;
            pairs.insert((i, j));
        }
        if pairs.is_empty() {
            return Err(SwError::EmptyRestrictFile);
        }
        log::info!("pair restriction: {} pairs", pairs.len());
        Ok(Self { pairs })
    }

    /// O(1) membership test; always true for the unrestricted set.
    #[inline]
    #[must_use]
    pub fn check(&self, i: usize, j: usize) -> bool {
        self.pairs.is_empty() || self.pairs.contains(&(i as u32, j as u32))
    }
}

fn header_id_map(multiseq: &MultiSeq) -> HashMap<String, u32> {
    let mut map = HashMap::new();
    for seqnum in 0..multiseq.sequences_number() {
        map.insert(multiseq.short_header(seqnum).to_string(), seqnum as u32);
    }
    map
}

fn convert_header(header_ids: &HashMap<String, u32>, id: &str) -> SwResult<u32> {
    if !id.is_empty() && id.bytes().all(|c| c.is_ascii_digit()) {
        return id
            .parse()
            .map_err(|_| SwError::InvalidArgument(format!("sequence index {id} out of range")));
    }
    header_ids
        .get(id)
        .copied()
        .ok_or_else(|| SwError::InvalidArgument(format!("unknown sequence id \"{id}\" in pair restriction file")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn multiseq() -> MultiSeq {
        let fasta = ">alpha first\nACGT\n>beta second\nACGT\n>42\nACGT\n";
        MultiSeq::from_reader(BufReader::new(std::io::Cursor::new(fasta.to_string()))).unwrap()
    }

    #[test]
    fn unrestricted_set_accepts_everything() {
        let restriction = PairRestriction::none();
        assert!(restriction.check(0, 99));
    }

    #[test]
    fn header_and_index_ids_resolve() {
        let ms = multiseq();
        let ids = header_id_map(&ms);
        assert_eq!(convert_header(&ids, "alpha").unwrap(), 0);
        assert_eq!(convert_header(&ids, "beta").unwrap(), 1);
        // digits are literal indices, not header lookups
        assert_eq!(convert_header(&ids, "1").unwrap(), 1);
        assert!(convert_header(&ids, "gamma").is_err());
    }

    #[test]
    fn restriction_filters_pairs() {
        let mut pairs = HashSet::new();
        pairs.insert((0u32, 1u32));
        let restriction = PairRestriction { pairs };
        assert!(restriction.check(0, 1));
        assert!(!restriction.check(1, 0));
    }
}
