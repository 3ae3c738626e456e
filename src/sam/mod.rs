//! SAM-to-pairwise-alignment engine (spec §4.4–§4.8): groups SAM records by
//! query name, merges each block into a reference/query pair widened for
//! insertions, optionally trims to an ungapped reference sub-range, and
//! writes the result as pairwise FASTA.

pub mod aligner;
pub mod grouper;
pub mod pipeline;
pub mod trimmer;
pub mod types;
pub mod writer;

pub use pipeline::{run, SamPipelineConfig};

use anyhow::{Context, Result};
use bio::io::fasta;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::sam::writer::PairwiseWriter;

const VERSION: &str = "1.0.0";

/// Loads the single reference record expected by `sam topalign`, upper-
/// casing its sequence before use.
fn load_reference(path: &Path) -> Result<(String, Vec<u8>)> {
    let reader = fasta::Reader::from_file(path).with_context(|| format!("opening reference FASTA {}", path.display()))?;
    let mut records = reader.records();
    let record = records
        .next()
        .ok_or_else(|| PipelineError::InputFormat { line: 0, message: "reference FASTA is empty".into() })?
        .with_context(|| "parsing reference record")?;
    let mut seq = record.seq().to_vec();
    seq.make_ascii_uppercase();
    Ok((record.id().to_owned(), seq))
}

/// `--trimstart`/`--trimend` must be given together or not at all.
fn resolve_trim_range(trim_start: Option<usize>, trim_end: Option<usize>) -> Result<Option<(usize, usize)>, PipelineError> {
    match (trim_start, trim_end) {
        (Some(s), Some(e)) => Ok(Some((s, e))),
        (None, None) => Ok(None),
        _ => Err(PipelineError::InvalidArgs {
            message: "--trimstart and --trimend must be given together".into(),
        }),
    }
}

/// CLI entry point for `ap-utils sam topalign`: validates arguments, loads
/// the reference, opens the output sink, and drives [`pipeline::run`].
#[allow(clippy::too_many_arguments)]
pub fn run_cli(
    sam_path: &Path,
    reference_path: &Path,
    trim_start: Option<usize>,
    trim_end: Option<usize>,
    wrap: i64,
    omit_ref: bool,
    omit_ins: bool,
    threads: Option<usize>,
    out: &str,
) -> Result<()> {
    simple_logger::SimpleLogger::new().env().init()?;
    log::info!("{}", format!("This is sam-topalign version {VERSION}").bold().bright_green());

    let trim_range = resolve_trim_range(trim_start, trim_end)?;
    let (ref_name, reference) = load_reference(reference_path)?;
    let threads = threads.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));

    let config = SamPipelineConfig { trim_range, wrap, omit_ref, omit_ins, threads };

    if out == "-" {
        let mut stdout = std::io::stdout().lock();
        let mut writer = PairwiseWriter::stream(&mut stdout, omit_ref, wrap);
        pipeline::run(sam_path, &reference, &ref_name, &mut writer, config)
    } else {
        let mut writer = PairwiseWriter::directory(PathBuf::from(out), omit_ref, wrap)?;
        pipeline::run(sam_path, &reference, &ref_name, &mut writer, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_trim_bounds_given_together_is_ok() {
        assert_eq!(resolve_trim_range(Some(2), Some(4)).unwrap(), Some((2, 4)));
    }

    #[test]
    fn neither_trim_bound_given_is_ok() {
        assert_eq!(resolve_trim_range(None, None).unwrap(), None);
    }

    #[test]
    fn one_trim_bound_without_the_other_is_rejected() {
        assert!(resolve_trim_range(Some(2), None).is_err());
        assert!(resolve_trim_range(None, Some(4)).is_err());
    }
}
