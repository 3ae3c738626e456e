//! C9 orchestrator for the SAM-to-pairwise-alignment engine: grouper reader
//! → N aligner workers → N trimmer workers → ordered writer, the same
//! `std::thread::scope` + bounded `crossbeam-channel` + reorder-buffer shape
//! as `closest::pipeline::run`, grounded on the same nextclade pipeline
//! pattern (see that module's header comment) and specialized here into two
//! distinct worker pools since spec §2's data flow keeps C6 and C7 separate.

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sam::aligner::align_block;
use crate::sam::grouper::SamGrouper;
use crate::sam::trimmer::trim;
use crate::sam::types::Block;
use crate::sam::writer::PairwiseWriter;

pub struct SamPipelineConfig {
    pub trim_range: Option<(usize, usize)>,
    pub wrap: i64,
    pub omit_ref: bool,
    pub omit_ins: bool,
    pub threads: usize,
}

struct Aligned {
    idx: usize,
    query_name: String,
    ref_seq: Vec<u8>,
    query_seq: Vec<u8>,
}

struct Trimmed {
    idx: usize,
    query_name: String,
    ref_seq: Vec<u8>,
    query_seq: Vec<u8>,
}

/// Runs the SAM-to-pairwise pipeline end to end against `reference`, writing
/// ordered pairs to `writer`.
pub fn run(sam_path: &Path, reference: &[u8], ref_name: &str, writer: &mut PairwiseWriter, config: SamPipelineConfig) -> Result<()> {
    let threads = config.threads.max(1);
    let reference = Arc::new(reference.to_vec());

    let (block_tx, block_rx) = crossbeam_channel::bounded::<Block>(threads);
    let (aligned_tx, aligned_rx) = crossbeam_channel::bounded::<Aligned>(threads);
    let (trimmed_tx, trimmed_rx) = crossbeam_channel::bounded::<Trimmed>(threads);
    let (err_tx, err_rx) = crossbeam_channel::bounded::<anyhow::Error>(1);

    let cancelled = Arc::new(AtomicBool::new(false));

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let (_header, grouper) = match SamGrouper::open(sam_path) {
                Ok(g) => g,
                Err(e) => {
                    let _ = err_tx.try_send(e);
                    return;
                }
            };
            for block in grouper {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                match block {
                    Ok(block) => {
                        if block_tx.send(block).is_err() {
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
            drop(block_tx);
        });

        for _ in 0..threads {
            let block_rx = block_rx.clone();
            let aligned_tx = aligned_tx.clone();
            let err_tx = err_tx.clone();
            let cancelled = Arc::clone(&cancelled);
            let reference = Arc::clone(&reference);
            let omit_ins = config.omit_ins;

            scope.spawn(move || {
                for block in block_rx {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    let idx = block.idx;
                    let query_name = block.qname().to_owned();
                    match align_block(&block, &reference, omit_ins) {
                        Ok((ref_seq, query_seq)) => {
                            if aligned_tx.send(Aligned { idx, query_name, ref_seq, query_seq }).is_err() {
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
        drop(block_rx);
        drop(aligned_tx);

        for _ in 0..threads {
            let aligned_rx = aligned_rx.clone();
            let trimmed_tx = trimmed_tx.clone();
            let err_tx = err_tx.clone();
            let cancelled = Arc::clone(&cancelled);
            let trim_range = config.trim_range;

            scope.spawn(move || {
                for aligned in aligned_rx {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    let result = match trim_range {
                        Some((start, end)) => trim(&aligned.ref_seq, &aligned.query_seq, start, end),
                        None => Ok((aligned.ref_seq, aligned.query_seq)),
                    };
                    match result {
                        Ok((ref_seq, query_seq)) => {
                            let trimmed = Trimmed { idx: aligned.idx, query_name: aligned.query_name, ref_seq, query_seq };
                            if trimmed_tx.send(trimmed).is_err() {
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
        drop(aligned_rx);
        drop(trimmed_tx);

        let mut buffer: HashMap<usize, Trimmed> = HashMap::new();
        let mut next_idx = 0usize;

        for trimmed in trimmed_rx {
            buffer.insert(trimmed.idx, trimmed);
            while let Some(ready) = buffer.remove(&next_idx) {
                if let Err(e) = writer.write_pair(ref_name, &ready.query_name, &ready.ref_seq, &ready.query_seq) {
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
