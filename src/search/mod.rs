//! The all-against-all comparison driver.
//!
//! The comparison matrix is tiled, the tiles are drawn from a shared atomic
//! counter by a pool of workers, and each worker owns its SIMD working set,
//! its re-alignment state and its output sink. Results either stream to
//! per-thread files or feed per-thread bounded top-K stores that are merged
//! after the join.

pub mod arg_parsing;
pub mod restrict;
pub mod store_best;
pub mod tiling;
pub mod writers;

pub use arg_parsing::{AlignmentDisplay, ParsedSearch, SearchArgs, SearchConfig, parse_search_args};

use crate::{
    SwError, SwResult,
    align::{
        coords::{LocalAlignmentCoordinates, StoredMatch},
        matrices::ScoreScheme,
        ssw::{SswProfile, SswResources, ssw_align},
    },
    seq::MultiSeq,
};
use restrict::PairRestriction;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    sync::atomic::{AtomicUsize, Ordering},
};
use store_best::{BoundedBest, multiway_merge};
use tiling::MatrixPartition;
use writers::{OutputContext, Polisher, ThreadsOutputFiles};

/// Denominator of the tile cut length; stop-after-first uses a divisor of
/// one instead.
const SEQNUM_DIVISOR: usize = 10;

/// Entry point of the `swalign` binary.
pub fn search_process(args: SearchArgs) -> SwResult<()> {
    let parsed = parse_search_args(args)?;
    let stdout = io::stdout();
    run_search(parsed, &mut stdout.lock())
}

/// Everything a worker needs by reference.
struct WorkerEnv<'a> {
    scheme:         &'static ScoreScheme,
    db_multiseq:    &'a MultiSeq,
    query_multiseq: &'a MultiSeq,
    restriction:    &'a PairRestriction,
    config:         &'a SearchConfig,
    partition:      &'a MatrixPartition,
    next_tile:      &'a AtomicUsize,
    max_seq_len:    usize,
}

fn run_search<W: Write>(parsed: ParsedSearch, out: &mut W) -> SwResult<()> {
    let ParsedSearch {
        multiseqs,
        scheme,
        blast_statistics,
        restriction,
        config,
    } = parsed;
    let db_multiseq = multiseqs.db();
    let query_multiseq = multiseqs.query();
    let context = OutputContext {
        scheme,
        blast_statistics: blast_statistics.as_ref(),
        db_multiseq,
        query_multiseq,
        config: &config,
    };
    context.write_preamble(out)?;

    let db_count = db_multiseq.sequences_number();
    let query_count = query_multiseq.sequences_number();
    let seqnum_divisor = if config.stop_after_first { 1 } else { SEQNUM_DIVISOR };
    let cut_len = 1.max(db_count.max(query_count) / seqnum_divisor);
    let partition = if multiseqs.same() {
        MatrixPartition::triangular(cut_len, db_count)
    } else {
        MatrixPartition::rectangular(cut_len, db_count, query_count)
    };
    log::info!(
        "comparing {db_count} x {query_count} sequences in {} tiles on {} threads",
        partition.len(),
        config.num_threads
    );

    let next_tile = AtomicUsize::new(0);
    let env = WorkerEnv {
        scheme,
        db_multiseq,
        query_multiseq,
        restriction: &restriction,
        config: &config,
        partition: &partition,
        next_tile: &next_tile,
        max_seq_len: multiseqs.maximum_sequence_length(),
    };

    if config.best > 0 {
        let per_thread = if config.num_threads == 1 {
            vec![run_best_worker(&env)]
        } else {
            build_pool(config.num_threads)?.broadcast(|_| run_best_worker(&env))
        };
        let merged = multiway_merge(per_thread, config.best);
        let mut polisher = Polisher::new(config.opt_memory);
        for stored in &merged {
            context.process(out, &mut polisher, &stored.coords, stored.u_seqnum, stored.v_seqnum)?;
        }
    } else if config.num_threads == 1 {
        let mut polisher = Polisher::new(config.opt_memory);
        let mut writer = BufWriter::new(&mut *out);
        run_stream_worker(&env, &context, &mut writer, &mut polisher)?;
        writer.flush()?;
    } else {
        let output_files = ThreadsOutputFiles::create(config.threads_out_prefix.as_deref(), config.num_threads)?;
        let results: Vec<SwResult<()>> = build_pool(config.num_threads)?.broadcast(|broadcast_context| {
            let path = output_files.filename(broadcast_context.index());
            let file = File::create(path).map_err(|e| SwError::open_failure(path, e))?;
            let mut writer = BufWriter::new(file);
            let mut polisher = Polisher::new(config.opt_memory);
            run_stream_worker(&env, &context, &mut writer, &mut polisher)?;
            writer.flush()?;
            Ok(())
        });
        results.into_iter().collect::<SwResult<()>>()?;
        output_files.finalize(out)?;
    }
    Ok(())
}

fn build_pool(num_threads: usize) -> SwResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| SwError::Internal(format!("cannot build thread pool: {e}")))
}

/// Draws tiles from the shared counter until they run out, calling `emit`
/// for the best alignment of every compared pair. `emit` returning `true`
/// stops the inner query loop of the current subject sequence.
fn drain_tiles<F>(env: &WorkerEnv<'_>, emit: &mut F) -> SwResult<()>
where
    F: FnMut(&LocalAlignmentCoordinates, usize, usize) -> SwResult<bool>,
{
    let mut resources = SswResources::new(env.max_seq_len);
    // the kernel charges open + extension for the first gap character
    let weight_gap_o = (i16::from(env.config.gap_open) + i16::from(env.config.gap_extension)) as u8;
    let weight_gap_e = env.config.gap_extension as u8;
    let compute_only_end = env.config.vectorized_alignment == 1;

    loop {
        let task_num = env.next_tile.fetch_add(1, Ordering::Relaxed);
        if task_num >= env.partition.len() {
            return Ok(());
        }
        let tile = env.partition.tile(task_num);
        for i in tile.i_start..tile.i_start + tile.i_len {
            let profile = SswProfile::new(env.scheme, env.db_multiseq.sequence(i));
            let (start_j, end_j) = if tile.is_triangle() {
                (i + 1, tile.i_start + tile.i_len)
            } else {
                (tile.j_start, tile.j_start + tile.j_len)
            };
            for j in start_j..end_j {
                if !env.restriction.check(i, j) {
                    continue;
                }
                let query_seq = env.query_multiseq.sequence(j);
                let coords = ssw_align(
                    &profile,
                    &mut resources,
                    query_seq,
                    weight_gap_o,
                    weight_gap_e,
                    compute_only_end,
                    true,
                );
                let best = if env.config.try_reverse_strand {
                    let coords_rc = ssw_align(
                        &profile,
                        &mut resources,
                        query_seq,
                        weight_gap_o,
                        weight_gap_e,
                        compute_only_end,
                        false,
                    );
                    if coords_rc.better_than(&coords) { coords_rc } else { coords }
                } else {
                    coords
                };
                if emit(&best, i, j)? {
                    break;
                }
            }
        }
    }
}

fn run_best_worker(env: &WorkerEnv<'_>) -> Vec<StoredMatch> {
    let mut store = BoundedBest::new(env.config.best);
    // emitting into the store never stops a row and never fails
    drain_tiles(env, &mut |coords, i, j| {
        store.add(StoredMatch::new(*coords, i, j));
        Ok(false)
    })
    .expect("storing matches is infallible");
    store.into_sorted()
}

fn run_stream_worker<W: Write>(
    env: &WorkerEnv<'_>, context: &OutputContext<'_>, writer: &mut W, polisher: &mut Polisher,
) -> SwResult<()> {
    drain_tiles(env, &mut |coords, i, j| context.process(writer, polisher, coords, i, j))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{align::matrices, seq::{MultiSeq, MultiSeqPair}};
    use std::io::BufReader;

    fn multiseq(fasta: &str) -> MultiSeq {
        MultiSeq::from_reader(BufReader::new(std::io::Cursor::new(fasta.to_string()))).unwrap()
    }

    fn parsed_for(db_fasta: &str, query_fasta: Option<&str>, configure: impl FnOnce(&mut SearchConfig)) -> ParsedSearch {
        let db = multiseq(db_fasta);
        let query = query_fasta.map(multiseq);
        let mut multiseqs = MultiSeqPair::from_parts(db, query);
        let dna_alphabet = multiseqs.looks_like_dna();
        let scheme = matrices::scheme_from_name(None, dna_alphabet).unwrap();
        multiseqs.encode_with(&scheme.encoding());
        let blast_statistics = (!dna_alphabet && scheme.name == "blosum62")
            .then(|| crate::align::blast_stat::BlastStatistics::new(11, 1).unwrap());
        let mut config = SearchConfig {
            db_file: "db.fasta".into(),
            query_file: None,
            restrict_to_pairs_file: None,
            gap_open: 11,
            gap_extension: 1,
            vectorized_alignment: 2,
            try_reverse_strand: dna_alphabet,
            header_display: false,
            min_bit_or_raw_score: 0,
            num_threads: 1,
            threads_out_prefix: None,
            display: AlignmentDisplay::default(),
            display_spec: None,
            opt_memory: false,
            best: 0,
            stop_after_first: false,
            dna_alphabet,
        };
        configure(&mut config);
        ParsedSearch {
            multiseqs,
            scheme,
            blast_statistics,
            restriction: PairRestriction::none(),
            config,
        }
    }

    fn run_to_string(parsed: ParsedSearch) -> String {
        let mut out = Vec::new();
        run_search(parsed, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn record_lines(output: &str) -> Vec<&str> {
        output.lines().filter(|line| !line.starts_with('#')).collect()
    }

    #[test]
    fn simple_dna_match_record() {
        let output = run_to_string(parsed_for(
            ">ref\nACGTACGT\n",
            Some(">query\nACGTACGT\n"),
            |_| {},
        ));
        assert_eq!(record_lines(&output), vec!["0\t0\t0\t8\t0\t8\t16\t+"]);
    }

    #[test]
    fn protein_match_gets_a_bit_score() {
        // raw score 54 over BLOSUM62; bits = floor(0.267/ln2 * 54 - log2(0.041) + 0.5)
        let output = run_to_string(parsed_for(
            ">ref protein\nMKVLWAALLVTFLAGC\n",
            Some(">query protein\nMKVLWAALLVT\n"),
            |_| {},
        ));
        assert_eq!(record_lines(&output), vec!["0\t0\t0\t11\t0\t11\t54\t25"]);
    }

    #[test]
    fn self_comparison_skips_the_diagonal() {
        let output = run_to_string(parsed_for(
            ">a\nACGTACGT\n>b\nACGTACGT\n>c\nTTTTTTTT\n",
            None,
            |_| {},
        ));
        let pairs: Vec<String> = record_lines(&output)
            .iter()
            .map(|line| {
                let mut fields = line.split('\t');
                format!("{},{}", fields.next().unwrap(), fields.next().unwrap())
            })
            .collect();
        assert_eq!(pairs, ["0,1", "0,2", "1,2"]);
    }

    #[test]
    fn score_threshold_filters_records() {
        let output = run_to_string(parsed_for(
            ">a\nACGTACGT\n>b\nACGTACGT\n>c\nTTTTTTTT\n",
            None,
            |config| config.min_bit_or_raw_score = 10,
        ));
        // only the identical pair (raw score 16) survives
        assert_eq!(record_lines(&output).len(), 1);
    }

    #[test]
    fn best_mode_is_deterministic_across_thread_counts() {
        let mut db = String::new();
        let mut state = 0x2545F491u64;
        for seqnum in 0..24 {
            db.push_str(&format!(">s{seqnum}\n"));
            for _ in 0..60 {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                db.push(b"ACGT"[(state >> 33) as usize % 4] as char);
            }
            db.push('\n');
        }
        let single = run_to_string(parsed_for(&db, None, |config| {
            config.best = 5;
            config.num_threads = 1;
        }));
        let threaded = run_to_string(parsed_for(&db, None, |config| {
            config.best = 5;
            config.num_threads = 8;
        }));
        let single_records = record_lines(&single);
        assert_eq!(single_records.len(), 5);
        assert_eq!(single_records, record_lines(&threaded));
    }

    #[test]
    fn display_columns_include_cigar_and_identity() {
        let output = run_to_string(parsed_for(
            ">ref\nACGTACGT\n",
            Some(">query\nACGTACGT\n"),
            |config| {
                config.display = AlignmentDisplay::parse("identity+cigar").unwrap();
                config.display_spec = Some("identity+cigar".to_string());
            },
        ));
        assert_eq!(record_lines(&output), vec!["0\t0\t0\t8\t0\t8\t16\t+\t100.00\t8="]);
    }

    #[test]
    fn preamble_echoes_restriction_but_not_displayless_specs() {
        let output = run_to_string(parsed_for(
            ">ref\nACGTACGT\n",
            Some(">query\nACGTACGT\n"),
            |config| {
                config.restrict_to_pairs_file = Some("pairs.tsv".into());
                // coverage columns alone need no re-alignment and are not
                // echoed as -a
                config.display = AlignmentDisplay::parse("s-cov").unwrap();
                config.display_spec = Some("s-cov".to_string());
            },
        ));
        let options_line = output.lines().find(|line| line.starts_with("# Options:")).unwrap();
        assert!(options_line.contains(" -r pairs.tsv"));
        assert!(!options_line.contains(" -a "));

        let output = run_to_string(parsed_for(
            ">ref\nACGTACGT\n",
            Some(">query\nACGTACGT\n"),
            |config| {
                config.display = AlignmentDisplay::parse("identity").unwrap();
                config.display_spec = Some("identity".to_string());
            },
        ));
        let options_line = output.lines().find(|line| line.starts_with("# Options:")).unwrap();
        assert!(options_line.contains(" -a identity"));
    }

    #[test]
    fn preamble_announces_the_fields() {
        let output = run_to_string(parsed_for(
            ">ref\nACGTACGT\n",
            Some(">query\nACGTACGT\n"),
            |_| {},
        ));
        let fields_line = output.lines().find(|line| line.starts_with("# Fields:")).unwrap();
        assert_eq!(
            fields_line,
            "# Fields: s. seqnum, q. seqnum, s. start, s. len, q. start, q. len, score, strand"
        );
    }
}
