//! Result record formatting, per-thread output files and the textual
//! alignment view.

use crate::{
    SwError, SwResult,
    align::{
        banded::DiagonalBandAligner,
        blast_stat::BlastStatistics,
        coords::LocalAlignmentCoordinates,
        eoplist::{EopType, Eoplist},
        matrices::ScoreScheme,
    },
    search::arg_parsing::SearchConfig,
    seq::{EncodedSubstring, MultiSeq},
};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// The per-worker re-alignment state: a banded aligner and a transcript,
/// both reused across matches.
pub struct Polisher {
    banded:  DiagonalBandAligner,
    eoplist: Eoplist,
}

impl Polisher {
    #[must_use]
    pub fn new(opt_memory: bool) -> Self {
        Self {
            banded:  DiagonalBandAligner::new(opt_memory),
            eoplist: Eoplist::new(),
        }
    }
}

/// Read-only state shared by all workers for formatting result records.
pub struct OutputContext<'a> {
    pub scheme:           &'a ScoreScheme,
    pub blast_statistics: Option<&'a BlastStatistics>,
    pub db_multiseq:      &'a MultiSeq,
    pub query_multiseq:   &'a MultiSeq,
    pub config:           &'a SearchConfig,
}

impl OutputContext<'_> {
    /// Echoes the effective options and the field list, mirroring the
    /// columns [`process`](Self::process) will emit.
    pub fn write_preamble<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let config = self.config;
        write!(out, "# Options: swalign")?;
        if let Some(prefix) = &config.threads_out_prefix {
            write!(out, " -o {prefix}")?;
        }
        if let Some(restrict_file) = &config.restrict_to_pairs_file {
            write!(out, " -r {}", restrict_file.display())?;
        }
        write!(out, " -v {}", config.vectorized_alignment)?;
        write!(out, " -g {} {}", config.gap_open, config.gap_extension)?;
        if config.display.need_alignment()
            && let Some(spec) = &config.display_spec
        {
            write!(out, " -a {spec}")?;
        }
        if config.best > 0 {
            write!(out, " -b {}", config.best)?;
        }
        if config.min_bit_or_raw_score > 0 {
            write!(out, " -c {}", config.min_bit_or_raw_score)?;
        }
        if config.header_display {
            write!(out, " -H")?;
        }
        if config.num_threads > 1 {
            write!(out, " -t {}", config.num_threads)?;
        }
        write!(out, " -d {}", config.db_file.display())?;
        if let Some(query_file) = &config.query_file {
            write!(out, " -q {}", query_file.display())?;
        }
        writeln!(out)?;

        let tag = if config.header_display { "id" } else { "num" };
        if config.vectorized_alignment == 2 {
            write!(out, "# Fields: s. seq{tag}, q. seq{tag}, s. start, s. len, q. start, q. len, score")?;
        } else {
            write!(out, "# Fields: s. seq{tag}, q. seq{tag}, s. end, q. end, score")?;
        }
        if self.blast_statistics.is_some() {
            write!(out, ", bit score")?;
        }
        if config.dna_alphabet {
            write!(out, ", strand")?;
        }
        let display = &config.display;
        if display.s_coverage {
            write!(out, ", s. cov")?;
        }
        if display.q_coverage {
            write!(out, ", q. cov")?;
        }
        if display.identity {
            write!(out, ", identity")?;
        }
        if display.cigar {
            write!(out, ", cigar")?;
        }
        if display.s_substring {
            write!(out, ", s. substr")?;
        }
        if display.q_substring {
            write!(out, ", q. substr")?;
        }
        writeln!(out)
    }

    /// Formats one match record; applies the score filter, the optional
    /// banded re-alignment and the requested derived columns.
    ///
    /// Returns `true` when the caller should stop comparing the current
    /// subject sequence (stop-after-first).
    pub fn process<W: Write>(
        &self, out: &mut W, polisher: &mut Polisher, coords: &LocalAlignmentCoordinates, i: usize, j: usize,
    ) -> SwResult<bool> {
        let config = self.config;
        let score = match self.blast_statistics {
            Some(statistics) => statistics.raw_to_bit(coords.raw_score),
            None => coords.raw_score,
        };
        if score < config.min_bit_or_raw_score {
            return Ok(false);
        }

        if config.header_display {
            write!(
                out,
                "{}\t{}\t",
                self.db_multiseq.short_header(i),
                self.query_multiseq.short_header(j)
            )?;
        } else {
            write!(out, "{i}\t{j}\t")?;
        }
        let query_len = self.query_multiseq.sequence_length(j);
        if coords.usubstringlength + coords.vsubstringlength == 0 {
            write!(out, "{}\t{}\t{}", coords.ustart, coords.vstart, coords.raw_score)?;
        } else {
            write!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                coords.ustart,
                coords.usubstringlength,
                coords.vstart_forward(query_len),
                coords.vsubstringlength,
                coords.raw_score
            )?;
        }
        if self.blast_statistics.is_some() {
            write!(out, "\t{score}")?;
        }
        if config.dna_alphabet {
            write!(out, "\t{}", if coords.forward_strand { '+' } else { '-' })?;
        }
        let display = &config.display;
        let db_len = self.db_multiseq.sequence_length(i);
        if display.s_coverage {
            write!(out, "\t{:.2}", 100.0 * coords.usubstringlength as f64 / db_len as f64)?;
        }
        if display.q_coverage {
            write!(out, "\t{:.2}", 100.0 * coords.vsubstringlength as f64 / query_len as f64)?;
        }

        if display.need_alignment() || display.s_substring || display.q_substring {
            let usubstring = EncodedSubstring::new(self.db_multiseq.sequence(i), coords.ustart, coords.usubstringlength);
            let vsubstring = EncodedSubstring::new_stranded(
                coords.forward_strand,
                self.query_multiseq.sequence(j),
                coords.vstart,
                coords.vsubstringlength,
            );
            if display.need_alignment() {
                debug_assert!(coords.raw_score > 0);
                let eoplist = display.need_traceback().then_some(&mut polisher.eoplist);
                let dp_score = polisher.banded.alignment_get(
                    eoplist,
                    config.gap_open,
                    config.gap_extension,
                    self.scheme,
                    &usubstring,
                    &vsubstring,
                    false,
                    Some(coords.raw_score),
                );
                if dp_score != coords.raw_score as i32 {
                    return Err(SwError::Internal(format!(
                        "dp score {dp_score} != expected score {}",
                        coords.raw_score
                    )));
                }
            }
            if display.only_verify_score() {
                writeln!(out)?;
            } else {
                if display.identity {
                    write!(out, "\t{:.2}", 100.0 - polisher.eoplist.error_percentage())?;
                }
                if display.cigar {
                    write!(out, "\t{}", polisher.eoplist.cigar_string(true))?;
                }
                if display.s_substring {
                    write!(out, "\t{}", decode_substring(self.scheme, &usubstring))?;
                }
                if display.q_substring {
                    write!(out, "\t{}", decode_substring(self.scheme, &vsubstring))?;
                }
                writeln!(out)?;
                if display.subject_query_alignment() {
                    alignment_text_view(
                        out,
                        self.scheme,
                        &polisher.eoplist,
                        &usubstring,
                        coords.ustart,
                        &vsubstring,
                        coords.vstart_forward(query_len),
                        display.width,
                        self.db_multiseq
                            .maximum_sequence_length()
                            .max(self.query_multiseq.maximum_sequence_length()),
                    )?;
                }
            }
            #[cfg(debug_assertions)]
            if display.need_traceback() {
                let transcript_score = polisher.eoplist.evaluate_score(
                    &usubstring,
                    &vsubstring,
                    config.gap_open,
                    config.gap_extension,
                    self.scheme,
                );
                debug_assert!(transcript_score == coords.raw_score as i32);
            }
        } else {
            writeln!(out)?;
        }
        Ok(config.stop_after_first)
    }
}

fn decode_substring(scheme: &ScoreScheme, substring: &EncodedSubstring<'_>) -> String {
    (0..substring.len()).map(|idx| scheme.to_char(substring.get(idx))).collect()
}

const MATCH_SYMBOL: u8 = b'|';
const MISMATCH_SYMBOL: u8 = b' ';
const GAP_SYMBOL: u8 = b'-';

fn write_block<W: Write>(
    out: &mut W, width_of_numbers: usize, topbuf: &[u8], midbuf: &[u8], lowbuf: &[u8], top_start: usize,
    top_end: usize, low_start: usize, low_end: usize,
) -> io::Result<()> {
    write!(out, "Sbjct  {top_start:<width_of_numbers$}  ")?;
    out.write_all(topbuf)?;
    writeln!(out, "  {top_end}")?;
    write!(out, "{:indent$}", "", indent = width_of_numbers + 5 + 4)?;
    out.write_all(midbuf)?;
    writeln!(out)?;
    write!(out, "Query  {low_start:<width_of_numbers$}  ")?;
    out.write_all(lowbuf)?;
    writeln!(out, "  {low_end}")?;
    writeln!(out)
}

/// Writes the BLAST-like Sbjct/Query view of one alignment in blocks of
/// `width` columns. `vstart_base` is the query start in forward-strand
/// coordinates.
#[allow(clippy::too_many_arguments)]
fn alignment_text_view<W: Write>(
    out: &mut W, scheme: &ScoreScheme, eoplist: &Eoplist, usubstring: &EncodedSubstring<'_>, ustart: usize,
    vsubstring: &EncodedSubstring<'_>, vstart_base: usize, width: usize, max_length: usize,
) -> io::Result<()> {
    let maximum_position = max_length.saturating_sub(1);
    let width_of_numbers = if maximum_position < 10 {
        1
    } else {
        1 + maximum_position.ilog10() as usize
    };
    let mut topbuf = vec![0u8; width];
    let mut midbuf = vec![0u8; width];
    let mut lowbuf = vec![0u8; width];
    let mut pos = 0usize;
    let mut idx_u = 0usize;
    let mut idx_v = 0usize;
    let mut top_start = ustart;
    let mut low_start = vstart_base;

    for operator in eoplist.cigar_ops(true) {
        match operator.op {
            EopType::Match | EopType::Mismatch => {
                for _ in 0..operator.iteration {
                    if idx_u >= usubstring.len() || idx_v >= vsubstring.len() {
                        break;
                    }
                    let cc_a = usubstring.get(idx_u);
                    let cc_b = vsubstring.get(idx_v);
                    topbuf[pos] = scheme.to_char(cc_a) as u8;
                    lowbuf[pos] = scheme.to_char(cc_b) as u8;
                    midbuf[pos] = if cc_a == cc_b { MATCH_SYMBOL } else { MISMATCH_SYMBOL };
                    pos += 1;
                    if pos == width {
                        write_block(
                            out,
                            width_of_numbers,
                            &topbuf,
                            &midbuf,
                            &lowbuf,
                            top_start,
                            ustart + idx_u,
                            low_start,
                            vstart_base + idx_v,
                        )?;
                        pos = 0;
                        top_start = ustart + idx_u + 1;
                        low_start = vstart_base + idx_v + 1;
                    }
                    idx_u += 1;
                    idx_v += 1;
                }
            }
            EopType::Deletion => {
                for _ in 0..operator.iteration {
                    if idx_u >= usubstring.len() {
                        break;
                    }
                    topbuf[pos] = scheme.to_char(usubstring.get(idx_u)) as u8;
                    midbuf[pos] = MISMATCH_SYMBOL;
                    lowbuf[pos] = GAP_SYMBOL;
                    pos += 1;
                    if pos == width {
                        write_block(
                            out,
                            width_of_numbers,
                            &topbuf,
                            &midbuf,
                            &lowbuf,
                            top_start,
                            ustart + idx_u,
                            low_start,
                            (vstart_base + idx_v).saturating_sub(1),
                        )?;
                        pos = 0;
                        top_start = ustart + idx_u + 1;
                        low_start = vstart_base + idx_v;
                    }
                    idx_u += 1;
                }
            }
            EopType::Insertion => {
                for _ in 0..operator.iteration {
                    if idx_v >= vsubstring.len() {
                        break;
                    }
                    topbuf[pos] = GAP_SYMBOL;
                    midbuf[pos] = MISMATCH_SYMBOL;
                    lowbuf[pos] = scheme.to_char(vsubstring.get(idx_v)) as u8;
                    pos += 1;
                    if pos == width {
                        write_block(
                            out,
                            width_of_numbers,
                            &topbuf,
                            &midbuf,
                            &lowbuf,
                            top_start,
                            (ustart + idx_u).saturating_sub(1),
                            low_start,
                            vstart_base + idx_v,
                        )?;
                        pos = 0;
                        top_start = ustart + idx_u;
                        low_start = vstart_base + idx_v + 1;
                    }
                    idx_v += 1;
                }
            }
        }
    }
    if pos > 0 {
        write_block(
            out,
            width_of_numbers,
            &topbuf[..pos],
            &midbuf[..pos],
            &lowbuf[..pos],
            top_start,
            ustart + idx_u.saturating_sub(1),
            low_start,
            vstart_base + idx_v.saturating_sub(1),
        )?;
    }
    Ok(())
}

/// The per-thread output files of the streaming mode.
///
/// With a prefix the files `<prefix>_thread_NN.tsv` are created next to the
/// caller and listed on stdout at shutdown. Without a prefix they live in a
/// temporary directory; at shutdown their contents are written to stdout in
/// thread order and the directory is removed.
pub struct ThreadsOutputFiles {
    has_prefix: bool,
    temp_dir:   Option<PathBuf>,
    filenames:  Vec<PathBuf>,
}

impl ThreadsOutputFiles {
    pub fn create(threads_out_prefix: Option<&str>, num_threads: usize) -> SwResult<Self> {
        debug_assert!(num_threads > 1);
        let (base, separator, temp_dir) = match threads_out_prefix {
            Some(prefix) => (prefix.to_string(), '_', None),
            None => {
                let dir = PathBuf::from(format!("swalign.tmp.{}", std::process::id()));
                fs::create_dir(&dir).map_err(|e| SwError::open_failure(&dir, e))?;
                log::info!("store output in temporary directory {}", dir.display());
                (dir.to_string_lossy().into_owned(), '/', Some(dir))
            }
        };
        let filenames = (0..num_threads)
            .map(|t| PathBuf::from(format!("{base}{separator}thread_{t:02}.tsv")))
            .collect();
        Ok(Self {
            has_prefix: threads_out_prefix.is_some(),
            temp_dir,
            filenames,
        })
    }

    #[must_use]
    pub fn filename(&self, thread_idx: usize) -> &Path {
        &self.filenames[thread_idx]
    }

    /// Publishes the finished files: either lists their names, or streams
    /// their contents to stdout and removes them.
    pub fn finalize<W: Write>(self, out: &mut W) -> SwResult<()> {
        if self.has_prefix {
            for filename in &self.filenames {
                writeln!(out, "# output file\t{}", filename.display())?;
            }
            return Ok(());
        }
        for filename in &self.filenames {
            let mut file = fs::File::open(filename).map_err(|e| SwError::open_failure(filename, e))?;
            io::copy(&mut file, out)?;
            fs::remove_file(filename)?;
        }
        if let Some(temp_dir) = &self.temp_dir {
            fs::remove_dir(temp_dir)?;
        }
        Ok(())
    }
}
