//! C7: slices an `AlignedPair` down to a `[trimStart, trimEnd]` window given
//! in 1-based ungapped reference coordinates (spec §4.7), grounded on the Go
//! source's `refToMSA` cumulative-gap-count translation in
//! `original_source/pkg/sam/topa.go`.

use anyhow::{bail, Result};

use crate::error::PipelineError;

/// Builds `refToMsa[k] = gaps observed in `ref_seq` before the k-th ungapped
/// reference base (0-based k, 0..=ungapped_len)`.
fn ref_to_msa(ref_seq: &[u8]) -> Vec<usize> {
    let mut table = Vec::with_capacity(ref_seq.len() + 1);
    let mut gaps = 0usize;
    for &b in ref_seq {
        if b == b'-' {
            gaps += 1;
        } else {
            table.push(gaps);
        }
    }
    table.push(gaps);
    table
}

fn ungapped_len(ref_seq: &[u8]) -> usize {
    ref_seq.iter().filter(|&&b| b != b'-').count()
}

/// Slices `(ref_seq, query_seq)` to the MSA columns spanning 1-based ungapped
/// reference positions `[trim_start, trim_end]` inclusive.
pub fn trim(ref_seq: &[u8], query_seq: &[u8], trim_start: usize, trim_end: usize) -> Result<(Vec<u8>, Vec<u8>)> {
    let ulen = ungapped_len(ref_seq);
    if trim_start < 1 || trim_start >= trim_end || trim_end > ulen {
        bail!(PipelineError::InvalidTrimRange {
            message: format!("trim range [{trim_start}, {trim_end}] invalid for ungapped reference length {ulen}"),
        });
    }

    let table = ref_to_msa(ref_seq);
    let adj_start = trim_start - 1 + table[trim_start - 1];
    let adj_end = trim_end + table[trim_end - 1];

    Ok((ref_seq[adj_start..adj_end].to_vec(), query_seq[adj_start..adj_end].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_gapped_reference_to_ungapped_window() {
        let (r, _q) = trim(b"A-TGCA", b"A-TGCA", 2, 4).unwrap();
        assert_eq!(r, b"TGC");
    }

    #[test]
    fn rejects_inverted_or_out_of_range_window() {
        assert!(trim(b"ATGCA", b"ATGCA", 4, 2).is_err());
        assert!(trim(b"ATGCA", b"ATGCA", 1, 6).is_err());
        assert!(trim(b"ATGCA", b"ATGCA", 0, 3).is_err());
    }
}
