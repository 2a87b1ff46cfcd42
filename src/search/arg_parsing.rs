//! Parsing and validation of the command line arguments.

use crate::{
    SwError, SwResult,
    align::{blast_stat::BlastStatistics, matrices::{self, ScoreScheme}},
    search::restrict::PairRestriction,
    seq::MultiSeqPair,
};
use clap::{Parser, builder::RangedI64ValueParser};
use std::path::PathBuf;

/// The command line arguments for the all-against-all search.
#[derive(Parser, Debug)]
#[command(name = "swalign", version, about, long_about = None)]
pub struct SearchArgs {
    /// Path to the FASTA file with the subject (database) sequences
    #[arg(short = 'd', long = "db")]
    pub db_file: PathBuf,

    /// Path to the FASTA file with the query sequences. Defaults to the
    /// database file, in which case only pairs above the diagonal are
    /// compared
    #[arg(short = 'q', long = "query")]
    pub query_file: Option<PathBuf>,

    /// Score matrix, specified by name. Defaults to blosum62 for protein
    /// and unit_score_nuc for DNA sequences
    #[arg(short = 's', long = "score-matrix")]
    pub score_matrix: Option<String>,

    /// The gap open and gap extension penalties, as nonnegative values
    #[arg(short = 'g', long = "gaps", num_args = 2, value_names = ["OPEN", "EXTEND"],
          default_values_t = [11, 1], value_parser = RangedI64ValueParser::<u8>::new().range(0..=127))]
    pub gaps: Vec<u8>,

    /// Mode of computation: 1 reports the score and end positions, 2
    /// additionally recovers the start positions
    #[arg(short = 'v', long = "vectorized", default_value_t = 2,
          value_parser = RangedI64ValueParser::<u8>::new().range(1..=2))]
    pub vectorized_alignment: u8,

    /// When processing DNA sequences, do not compare against the reverse
    /// strand
    #[arg(short = 'n', long = "no-reverse-strand")]
    pub no_reverse_strand: bool,

    /// Display sequence headers instead of sequence numbers
    #[arg(short = 'H', long = "headers")]
    pub header_display: bool,

    /// Minimum bit score of reported matches; filters on the raw score when
    /// no bit score statistics are available
    #[arg(short = 'c', long = "min-score", default_value_t = 0)]
    pub min_bit_or_raw_score: u32,

    /// Number of worker threads [default: all logical CPUs]
    #[arg(short = 't', long = "threads",
          value_parser = RangedI64ValueParser::<usize>::new().range(1..))]
    pub num_threads: Option<usize>,

    /// Prefix for the per-thread output files <PREFIX>_thread_NN.tsv. When
    /// omitted, the threads write into a temporary directory whose contents
    /// are written to stdout and removed on shutdown
    #[arg(short = 'o', long = "out-prefix")]
    pub threads_out_prefix: Option<String>,

    /// File with pairs of sequence ids (one tab-separated pair per line) to
    /// restrict the comparison to
    #[arg(short = 'r', long = "restrict")]
    pub restrict_to_pairs_file: Option<PathBuf>,

    /// Additional result columns, joined by '+': verify, s-cov, q-cov,
    /// identity, cigar, s-substr, q-substr, or a number >= 8 to display the
    /// alignment in that many columns (e.g. `-a identity+cigar+60`)
    #[arg(short = 'a', long = "display")]
    pub display: Option<String>,

    /// Trade less space for more time when computing alignments
    #[arg(short = 'm', long = "opt-memory")]
    pub opt_memory: bool,

    /// Report only the best B matches over all pairs of sequences
    #[arg(short = 'b', long = "best",
          value_parser = RangedI64ValueParser::<usize>::new().range(1..))]
    pub best: Option<usize>,

    /// Stop after the first reported match of each subject sequence
    #[arg(short = 'f', long = "stop-after-first")]
    pub stop_after_first: bool,
}

/// Which derived columns the output records carry.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlignmentDisplay {
    pub verify:      bool,
    pub s_coverage:  bool,
    pub q_coverage:  bool,
    pub identity:    bool,
    pub cigar:       bool,
    pub s_substring: bool,
    pub q_substring: bool,
    /// Columns of the textual alignment view; zero disables it.
    pub width:       usize,
}

impl AlignmentDisplay {
    pub const MIN_ALIGNMENT_WIDTH: usize = 8;

    /// Parses a `+`-joined display specification.
    pub fn parse(spec: &str) -> SwResult<Self> {
        let mut display = Self::default();
        for token in spec.split('+') {
            match token {
                "verify" => display.verify = true,
                "s-cov" => display.s_coverage = true,
                "q-cov" => display.q_coverage = true,
                "identity" => display.identity = true,
                "cigar" => display.cigar = true,
                "s-substr" => display.s_substring = true,
                "q-substr" => display.q_substring = true,
                _ => {
                    let width: usize = token.parse().map_err(|_| {
                        SwError::InvalidArgument(format!("illegal display flag \"{token}\" in argument to option -a"))
                    })?;
                    if width < Self::MIN_ALIGNMENT_WIDTH {
                        return Err(SwError::InvalidArgument(format!(
                            "alignment width in option -a must be at least {}",
                            Self::MIN_ALIGNMENT_WIDTH
                        )));
                    }
                    display.width = width;
                }
            }
        }
        Ok(display)
    }

    /// Whether a banded re-alignment is required at all.
    #[must_use]
    pub fn need_alignment(&self) -> bool {
        self.verify || self.identity || self.cigar || self.width > 0
    }

    /// Whether the re-alignment must also produce a transcript.
    #[must_use]
    pub fn need_traceback(&self) -> bool {
        self.identity || self.cigar || self.width > 0
    }

    /// Score verification was requested and nothing else.
    #[must_use]
    pub fn only_verify_score(&self) -> bool {
        self.verify
            && !(self.s_coverage
                || self.q_coverage
                || self.identity
                || self.cigar
                || self.s_substring
                || self.q_substring
                || self.width > 0)
    }

    #[must_use]
    pub fn subject_query_alignment(&self) -> bool {
        self.width > 0
    }
}

/// The validated configuration of one search run.
pub struct SearchConfig {
    pub db_file:                PathBuf,
    pub query_file:             Option<PathBuf>,
    pub restrict_to_pairs_file: Option<PathBuf>,
    pub gap_open:               i8,
    pub gap_extension:          i8,
    pub vectorized_alignment:   u8,
    pub try_reverse_strand:     bool,
    pub header_display:         bool,
    pub min_bit_or_raw_score:   u32,
    pub num_threads:            usize,
    pub threads_out_prefix:     Option<String>,
    pub display:                AlignmentDisplay,
    pub display_spec:           Option<String>,
    pub opt_memory:             bool,
    /// Size of the global top list; zero streams every match.
    pub best:                   usize,
    pub stop_after_first:       bool,
    pub dna_alphabet:           bool,
}

/// Everything the driver needs, parsed and validated.
pub struct ParsedSearch {
    pub multiseqs:        MultiSeqPair,
    pub scheme:           &'static ScoreScheme,
    pub blast_statistics: Option<BlastStatistics>,
    pub restriction:      PairRestriction,
    pub config:           SearchConfig,
}

/// Loads the input files, detects the alphabet, selects and applies the
/// score scheme and resolves the remaining options.
pub fn parse_search_args(args: SearchArgs) -> SwResult<ParsedSearch> {
    let [gap_open, gap_extension] = args.gaps[..] else {
        return Err(SwError::InvalidArgument("option -g requires two values".to_string()));
    };
    if gap_extension == 0 {
        return Err(SwError::InvalidArgument(
            "the gap extension penalty must be positive".to_string(),
        ));
    }
    let gap_open = gap_open as i8;
    let gap_extension = gap_extension as i8;

    let mut multiseqs = MultiSeqPair::load(&args.db_file, args.query_file.as_ref())?;
    let dna_alphabet = multiseqs.looks_like_dna();
    let scheme = matrices::scheme_from_name(args.score_matrix.as_deref(), dna_alphabet)?;
    multiseqs.encode_with(&scheme.encoding());

    let blast_statistics = if !dna_alphabet && scheme.name == "blosum62" {
        match BlastStatistics::new(gap_open, gap_extension) {
            Ok(statistics) => Some(statistics),
            Err(err) if args.min_bit_or_raw_score > 0 => return Err(err),
            Err(err) => {
                log::warn!("{err}; filtering on raw scores");
                None
            }
        }
    } else {
        None
    };

    let restriction = match &args.restrict_to_pairs_file {
        Some(path) => PairRestriction::from_file(path, multiseqs.db(), multiseqs.query())?,
        None => PairRestriction::none(),
    };

    let display = match &args.display {
        Some(spec) => AlignmentDisplay::parse(spec)?,
        None => AlignmentDisplay::default(),
    };
    // start coordinates are required as soon as substrings are re-aligned
    let vectorized_alignment = if args.vectorized_alignment == 1
        && (display.need_alignment() || display.s_substring || display.q_substring)
    {
        2
    } else {
        args.vectorized_alignment
    };

    Ok(ParsedSearch {
        multiseqs,
        scheme,
        blast_statistics,
        restriction,
        config: SearchConfig {
            db_file: args.db_file,
            query_file: args.query_file,
            restrict_to_pairs_file: args.restrict_to_pairs_file,
            gap_open,
            gap_extension,
            vectorized_alignment,
            try_reverse_strand: dna_alphabet && !args.no_reverse_strand,
            header_display: args.header_display,
            min_bit_or_raw_score: args.min_bit_or_raw_score,
            num_threads: args.num_threads.unwrap_or_else(num_cpus::get),
            threads_out_prefix: args.threads_out_prefix,
            display,
            display_spec: args.display,
            opt_memory: args.opt_memory,
            best: args.best.unwrap_or(0),
            stop_after_first: args.stop_after_first,
            dna_alphabet,
        },
    })
}
