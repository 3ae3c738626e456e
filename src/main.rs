mod closest;
mod codec;
mod distance;
mod error;
mod sam;

use std::path::PathBuf;
use clap::{Subcommand, Parser};
use anyhow::Result;

use crate::distance::Metric;
use crate::error::PipelineError;

#[derive(Parser)]
#[command(name = "ap-utils")]
#[command(about = "A collection of CLI utilities for the alignment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands
}

#[derive(Subcommand)]
enum Commands {
    /// Rank target sequences by genetic distance to each query (spec §4.3).
    Closest {
        /// Keep only the N closest targets per query (0 disables top-N truncation).
        #[arg(short = 'n', long, default_value_t = 0)]
        n: usize,

        /// Distance threshold cutoff (0 disables for raw/tn93; -1 disables for snp).
        #[arg(short = 'd', long)]
        dist: Option<f64>,

        /// Distance metric to rank under.
        #[arg(long, value_enum, default_value_t = Metric::Raw)]
        metric: Metric,

        /// Emit one (query, target, distance) row per kept target instead of a ranked list.
        #[arg(long)]
        table: bool,

        /// Worker thread count (defaults to available CPUs).
        #[arg(long)]
        threads: Option<usize>,

        /// Query sequences to rank.
        #[arg(long)]
        query: PathBuf,

        /// Target sequences to rank against.
        #[arg(long)]
        target: PathBuf,

        /// Output CSV path (defaults to stdout).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// SAM-to-pairwise-alignment tools (spec §4.4-§4.8).
    Sam {
        #[command(subcommand)]
        command: SamCommands,
    },
}

#[derive(Subcommand)]
enum SamCommands {
    /// Convert SAM records into per-query pairwise reference/query alignments.
    Topalign {
        /// 1-based ungapped reference start of the trim window (requires --trimend).
        #[arg(long)]
        trimstart: Option<usize>,

        /// 1-based ungapped reference end of the trim window (requires --trimstart).
        #[arg(long)]
        trimend: Option<usize>,

        /// Wrap output sequence lines at this width (<=0 emits one line per record).
        #[arg(long, default_value_t = 0)]
        wrap: i64,

        /// Suppress the reference record in the output.
        #[arg(long)]
        omit_ref: bool,

        /// Drop query insertions instead of widening the alignment for them.
        #[arg(long)]
        omit_ins: bool,

        /// Worker thread count (defaults to available CPUs).
        #[arg(long)]
        threads: Option<usize>,

        /// Input SAM/BAM file.
        #[arg(long)]
        sam: PathBuf,

        /// Reference FASTA (single record).
        #[arg(long)]
        reference: PathBuf,

        /// Output directory, or `-` to write a single stream to stdout.
        #[arg(long)]
        out: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<()> = match &cli.command {
        Commands::Closest { n, dist, metric, table, threads, query, target, out } => {
            closest::run_cli(query, target, *metric, *n, *dist, *table, *threads, out.as_deref())
        }
        Commands::Sam { command } => match command {
            SamCommands::Topalign { trimstart, trimend, wrap, omit_ref, omit_ins, threads, sam, reference, out } => {
                sam::run_cli(sam, reference, *trimstart, *trimend, *wrap, *omit_ref, *omit_ins, *threads, out)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("{e:?}");
        let exit_code = match e.downcast_ref::<PipelineError>() {
            Some(pipeline_err) if pipeline_err.is_internal() => 2,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}
