//! Closest-N engine (spec §4.3): ranks target sequences by genetic distance
//! for every query, with top-N truncation and distance-threshold cutoff.

pub mod pipeline;
pub mod rank;
pub mod target_set;
pub mod writer;

pub use pipeline::{run, ClosestNConfig};

use anyhow::Result;
use colored::Colorize;
use std::fs::File;
use std::io::{self, Write as _};
use std::path::Path;

use crate::distance::Metric;
use crate::error::PipelineError;

const VERSION: &str = "1.0.0";

/// Resolves the raw `--dist`/`-d` CLI value into the threshold `rank()`
/// understands (spec §4.3): for `snp` a negative value disables the
/// threshold and `0` keeps only exact matches; for `raw`/`tn93` `0` itself
/// disables the threshold (matching gofasta's own CLI default of `0.0`) and
/// any other value must fall in `(0,1]`, rejecting out-of-range cutoffs like
/// `--dist 5.0 --metric raw` as `InvalidArgs`.
fn resolve_threshold(dist: Option<f64>, metric: Metric) -> Result<Option<f64>, PipelineError> {
    let Some(d) = dist else { return Ok(None) };
    if metric == Metric::Snp {
        Ok(if d < 0.0 { None } else { Some(d) })
    } else if d == 0.0 {
        Ok(None)
    } else if d > 0.0 && d <= 1.0 {
        Ok(Some(d))
    } else {
        Err(PipelineError::InvalidArgs {
            message: format!("--dist {d} is out of range for --metric {metric:?}: must be in (0,1] or 0"),
        })
    }
}

/// CLI entry point for `ap-utils closest`: validates arguments, opens the
/// output sink, and drives [`pipeline::run`].
#[allow(clippy::too_many_arguments)]
pub fn run_cli(
    query: &Path,
    target: &Path,
    metric: Metric,
    n: usize,
    dist: Option<f64>,
    table: bool,
    threads: Option<usize>,
    out: Option<&Path>,
) -> Result<()> {
    simple_logger::SimpleLogger::new().env().init()?;
    log::info!("{}", format!("This is closest version {VERSION}").bold().bright_green());

    let threads = threads.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    let threshold = resolve_threshold(dist, metric)?;

    let config = ClosestNConfig { metric, n, threshold, table, threads };

    match out {
        Some(path) => {
            let mut file = File::create(path)
                .map_err(PipelineError::io(format!("creating output file {}", path.display())))?;
            pipeline::run(query, target, &mut file, config)
        }
        None => {
            let mut stdout = io::stdout().lock();
            pipeline::run(query, target, &mut stdout, config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables_threshold_for_raw_and_tn93() {
        assert_eq!(resolve_threshold(Some(0.0), Metric::Raw).unwrap(), None);
        assert_eq!(resolve_threshold(Some(0.0), Metric::Tn93).unwrap(), None);
    }

    #[test]
    fn zero_is_a_real_threshold_for_snp() {
        assert_eq!(resolve_threshold(Some(0.0), Metric::Snp).unwrap(), Some(0.0));
    }

    #[test]
    fn negative_disables_threshold_for_snp() {
        assert_eq!(resolve_threshold(Some(-1.0), Metric::Snp).unwrap(), None);
    }

    #[test]
    fn none_stays_disabled_for_every_metric() {
        assert_eq!(resolve_threshold(None, Metric::Raw).unwrap(), None);
        assert_eq!(resolve_threshold(None, Metric::Snp).unwrap(), None);
    }

    #[test]
    fn in_range_threshold_is_accepted_for_raw_and_tn93() {
        assert_eq!(resolve_threshold(Some(0.05), Metric::Raw).unwrap(), Some(0.05));
        assert_eq!(resolve_threshold(Some(1.0), Metric::Tn93).unwrap(), Some(1.0));
    }

    #[test]
    fn out_of_range_threshold_is_rejected_for_raw_and_tn93() {
        assert!(matches!(
            resolve_threshold(Some(5.0), Metric::Raw),
            Err(PipelineError::InvalidArgs { .. })
        ));
        assert!(matches!(
            resolve_threshold(Some(-0.5), Metric::Tn93),
            Err(PipelineError::InvalidArgs { .. })
        ));
    }

    #[test]
    fn negative_threshold_still_disables_for_snp_regardless_of_magnitude() {
        assert_eq!(resolve_threshold(Some(-5.0), Metric::Snp).unwrap(), None);
    }
}
