//! C9 orchestrator for the closest-N engine: reader → N ranking workers →
//! ordered merger/writer, wired with bounded `crossbeam-channel`s and
//! `std::thread::scope`, the same shape used by `nextclade_seq_sort`'s
//! `nextclade_run`/`nextclade_seq_sort` pipelines (a sister retrieved
//! example from the same bioinformatics-CLI domain): one reader thread,
//! `T` compute workers, one writer thread, and a single first-error-wins
//! error channel.

use anyhow::Result;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::closest::rank::{rank, Hit};
use crate::closest::target_set::{QueryReader, TargetSet};
use crate::closest::writer::CsvWriter;
use crate::distance::Metric;

pub struct ClosestNConfig {
    pub metric: Metric,
    pub n: usize,
    pub threshold: Option<f64>,
    pub table: bool,
    pub threads: usize,
}

struct RankedQuery {
    idx: usize,
    query_id: String,
    hits: Vec<Hit>,
}

/// Runs the closest-N pipeline end to end: loads `targets`, streams
/// `queries`, and writes ordered CSV rows to `out`.
pub fn run(query_path: &Path, target_path: &Path, out: &mut impl Write, config: ClosestNConfig) -> Result<()> {
    let targets = TargetSet::load(target_path)?;
    let threads = config.threads.max(1);

    let (query_tx, query_rx) = crossbeam_channel::bounded::<crate::closest::target_set::Record>(threads);
    let (result_tx, result_rx) = crossbeam_channel::bounded::<RankedQuery>(threads);
    let (err_tx, err_rx) = crossbeam_channel::bounded::<anyhow::Error>(1);

    let cancelled = Arc::new(AtomicBool::new(false));

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let reader = match QueryReader::from_path(query_path) {
                Ok(r) => r,
                Err(e) => {
                    let _ = err_tx.try_send(e);
                    return;
                }
            };
            for record in reader {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                match record {
                    Ok(record) => {
                        if query_tx.send(record).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = err_tx.try_send(e);
                        cancelled.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }
            drop(query_tx);
        });

        for _ in 0..threads {
            let query_rx = query_rx.clone();
            let result_tx = result_tx.clone();
            let err_tx = err_tx.clone();
            let cancelled = Arc::clone(&cancelled);
            let targets = &targets;
            let metric = config.metric;
            let n = config.n;
            let threshold = config.threshold;

            scope.spawn(move || {
                for query in query_rx {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    match rank(&query, targets, metric, n, threshold) {
                        Ok(hits) => {
                            let ranked = RankedQuery { idx: query.idx, query_id: query.id, hits };
                            if result_tx.send(ranked).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = err_tx.try_send(e);
                            cancelled.store(true, Ordering::Relaxed);
                            break;
                        }
                    }
                }
            });
        }
        drop(result_tx);
        drop(query_rx);

        let mut csv_writer = CsvWriter::new(&mut *out, config.table);
        let mut buffer: HashMap<usize, RankedQuery> = HashMap::new();
        let mut next_idx = 0usize;

        for ranked in result_rx {
            buffer.insert(ranked.idx, ranked);
            while let Some(ready) = buffer.remove(&next_idx) {
                if let Err(e) = csv_writer.write_query(&ready.query_id, &targets, &ready.hits) {
                    let _ = err_tx.try_send(e);
                    cancelled.store(true, Ordering::Relaxed);
                }
                next_idx += 1;
            }
        }
    });

    if let Ok(e) = err_rx.try_recv() {
        return Err(e);
    }

    Ok(())
}
