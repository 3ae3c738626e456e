//! C6: merges every record in a `Block` into a single reference/query
//! `AlignedPair`, widening the reference wherever any record in the block
//! carries an insertion relative to it. Grounded on `original_source`'s Go
//! `blockToSeqPair`/`getOneLinePlusRef` (pad-each-row-to-the-block-max then
//! flatten columnwise), generalized to accumulate a running per-row offset
//! when splicing a foreign insertion so multi-row blocks whose records start
//! at different POS values merge correctly — the Go source only spliced a
//! raw, unadjusted `insertion.start` into every other row, which is only
//! sound when every record in the block shares one POS; the spec names this
//! the corrected, offset-accumulating version of the algorithm.

use anyhow::{bail, Result};
use rust_htslib::bam::record::Cigar;

use crate::error::PipelineError;
use crate::sam::types::{Block, Insertion};

const GAP: u8 = b'-';
const UNKNOWN: u8 = b'*';

struct Row {
    ref_line: Vec<u8>,
    query_line: Vec<u8>,
    pos0: usize,
    consumed: usize,
    /// anchor[k] = index into ref_line/query_line of the k-th ref-consumed
    /// position relative to pos0 (k in 0..=consumed; k==consumed is the
    /// "append after the last consumed base" position).
    anchor: Vec<usize>,
}

/// Projects one record's cigar into a `Row`, starting the row with a leading
/// run of `*` for reference columns before `pos0` so every row in the block
/// shares one absolute-reference-coordinate index space (spec §4.6 step 2,
/// extended to cover records that don't all share the same POS).
fn project(
    line: &crate::sam::types::SamLine,
    row_idx: usize,
    reference: &[u8],
    omit_insertions: bool,
    insertions: &mut Vec<Insertion>,
) -> Result<Row> {
    let mut ref_line = vec![UNKNOWN; line.pos0];
    let mut query_line = vec![UNKNOWN; line.pos0];
    let mut anchor = vec![ref_line.len()];

    let mut ref_cursor = line.pos0;
    let mut qry_cursor = 0usize;
    let seq = &line.seq;

    for op in line.cigar.iter() {
        match *op {
            Cigar::Match(n) | Cigar::Equal(n) | Cigar::Diff(n) => {
                for _ in 0..n {
                    let qb = *seq.get(qry_cursor).ok_or_else(|| PipelineError::LengthMismatch {
                        message: format!("cigar consumes past end of SEQ at query pos {qry_cursor}"),
                    })?;
                    let rb = reference.get(ref_cursor).copied().unwrap_or(UNKNOWN);
                    ref_line.push(rb);
                    query_line.push(qb);
                    ref_cursor += 1;
                    qry_cursor += 1;
                    anchor.push(ref_line.len());
                }
            }
            Cigar::Del(n) | Cigar::RefSkip(n) => {
                for _ in 0..n {
                    let rb = reference.get(ref_cursor).copied().unwrap_or(UNKNOWN);
                    ref_line.push(rb);
                    query_line.push(GAP);
                    ref_cursor += 1;
                    anchor.push(ref_line.len());
                }
            }
            Cigar::Ins(n) => {
                if omit_insertions {
                    qry_cursor += n as usize;
                } else {
                    insertions.push(Insertion { start: ref_cursor, length: n as usize, row: row_idx });
                    for _ in 0..n {
                        let qb = *seq.get(qry_cursor).ok_or_else(|| PipelineError::LengthMismatch {
                            message: format!("cigar consumes past end of SEQ at query pos {qry_cursor}"),
                        })?;
                        ref_line.push(GAP);
                        query_line.push(qb);
                        qry_cursor += 1;
                    }
                }
            }
            Cigar::SoftClip(n) => qry_cursor += n as usize,
            Cigar::HardClip(_) | Cigar::Pad(_) => {}
        }
    }

    Ok(Row { ref_line, query_line, pos0: line.pos0, consumed: ref_cursor - line.pos0, anchor })
}

/// Splices `ins` into every row but its own, per spec §4.6 step 4, using a
/// running per-row `offset` so earlier splices on the same row shift later
/// ones correctly.
fn apply_insertion(rows: &mut [Row], offsets: &mut [usize], ins: Insertion) {
    for (j, row) in rows.iter_mut().enumerate() {
        if j == ins.row {
            continue;
        }
        let row_end = row.pos0 + row.consumed;
        if ins.start > row_end {
            continue; // reference coverage ended before this insertion
        }
        let base_index = if ins.start < row.pos0 {
            ins.start
        } else {
            row.anchor[ins.start - row.pos0]
        };
        let at = base_index + offsets[j];
        let splice = vec![GAP; ins.length];
        row.ref_line.splice(at..at, splice.iter().copied());
        row.query_line.splice(at..at, splice.iter().copied());
        offsets[j] += ins.length;
    }
}

/// Flattens a column of aligned rows into one reference character, failing
/// if two rows disagree on a real (non-`*`) base at the same column.
fn flatten_ref_column(values: &[u8]) -> Result<u8> {
    let mut agreed: Option<u8> = None;
    for &v in values {
        if v == UNKNOWN {
            continue;
        }
        match agreed {
            None => agreed = Some(v),
            Some(a) if a == v => {}
            Some(_) => bail!(PipelineError::InternalInconsistency {
                message: "block records disagree on reference base at the same column".into(),
            }),
        }
    }
    Ok(agreed.unwrap_or(UNKNOWN))
}

/// Merges a query column: unanimous agreement (or a single informative row)
/// passes through; disagreement among informative rows yields ambiguity.
fn flatten_query_column(values: &[u8]) -> u8 {
    let mut agreed: Option<u8> = None;
    let mut disagree = false;
    for &v in values {
        if v == UNKNOWN {
            continue;
        }
        match agreed {
            None => agreed = Some(v),
            Some(a) if a == v => {}
            Some(_) => disagree = true,
        }
    }
    if disagree {
        b'N'
    } else {
        agreed.unwrap_or(UNKNOWN)
    }
}

/// Builds the merged (`ref_seq`, `query_seq`) pair for `block` against
/// `reference`, widening for insertions unless `omit_insertions` is set.
pub fn align_block(block: &Block, reference: &[u8], omit_insertions: bool) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut insertions: Vec<Insertion> = Vec::new();
    let mut rows: Vec<Row> = block
        .records
        .iter()
        .enumerate()
        .map(|(i, line)| project(line, i, reference, omit_insertions, &mut insertions))
        .collect::<Result<_>>()?;

    insertions.sort_by_key(|i| i.start);
    let mut offsets = vec![0usize; rows.len()];
    for ins in &insertions {
        apply_insertion(&mut rows, &mut offsets, *ins);
    }

    let max_len = rows.iter().map(|r| r.ref_line.len()).max().unwrap_or(0);
    for row in &mut rows {
        row.ref_line.resize(max_len, UNKNOWN);
        row.query_line.resize(max_len, UNKNOWN);
    }

    let mut merged_ref = Vec::with_capacity(max_len);
    let mut merged_query = Vec::with_capacity(max_len);
    for col in 0..max_len {
        let ref_vals: Vec<u8> = rows.iter().map(|r| r.ref_line[col]).collect();
        let query_vals: Vec<u8> = rows.iter().map(|r| r.query_line[col]).collect();
        merged_ref.push(flatten_ref_column(&ref_vals)?);
        merged_query.push(flatten_query_column(&query_vals));
    }

    let total_insertion_len: usize = insertions.iter().map(|i| i.length).sum();
    let target_len = reference.len() + total_insertion_len;

    if merged_ref.len() < target_len {
        let diff = target_len - merged_ref.len();
        let tail_len = diff.min(reference.len());
        let leading_stars = diff - tail_len;
        merged_ref.extend(std::iter::repeat(UNKNOWN).take(leading_stars));
        merged_ref.extend_from_slice(&reference[reference.len() - tail_len..]);
        merged_query.extend(std::iter::repeat(UNKNOWN).take(diff));
    }

    for b in merged_query.iter_mut() {
        if *b == UNKNOWN {
            *b = b'N';
        }
    }

    Ok((merged_ref, merged_query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sam::types::{Block, SamLine};
    use rust_htslib::bam::record::CigarString;

    fn line(pos0: usize, ops: &[Cigar], seq: &[u8]) -> SamLine {
        let cigar = CigarString(ops.to_vec()).into_view(pos0 as i64);
        SamLine { qname: "q".into(), pos0, cigar, seq: seq.to_vec() }
    }

    fn block(lines: Vec<SamLine>) -> Block {
        Block { records: lines, idx: 0 }
    }

    #[test]
    fn single_record_full_coverage_no_insertion() {
        let b = block(vec![line(0, &[Cigar::Match(6)], b"ATGCAT")]);
        let (r, q) = align_block(&b, b"ATGCAT", false).unwrap();
        assert_eq!(r, b"ATGCAT");
        assert_eq!(q, b"ATGCAT");
    }

    #[test]
    fn single_record_with_insertion_widens_reference() {
        let b = block(vec![line(0, &[Cigar::Match(3), Cigar::Ins(2), Cigar::Match(3)], b"ATGNNCAT")]);
        let (r, q) = align_block(&b, b"ATGCAT", false).unwrap();
        assert_eq!(r, b"ATG--CAT");
        assert_eq!(q, b"ATGNNCAT");
    }

    #[test]
    fn omit_insertions_drops_inserted_bases() {
        let b = block(vec![line(0, &[Cigar::Match(3), Cigar::Ins(2), Cigar::Match(3)], b"ATGNNCAT")]);
        let (r, q) = align_block(&b, b"ATGCAT", true).unwrap();
        assert_eq!(r, b"ATGCAT");
        assert_eq!(q, b"ATGCAT");
    }

    #[test]
    fn second_row_without_the_insertion_is_widened_to_match() {
        let b = block(vec![
            line(0, &[Cigar::Match(3), Cigar::Ins(2), Cigar::Match(3)], b"ATGNNCAT"),
            line(0, &[Cigar::Match(6)], b"ATGCAT"),
        ]);
        let (r, q) = align_block(&b, b"ATGCAT", false).unwrap();
        assert_eq!(r, b"ATG--CAT");
        // row 1 has no bases at the inserted columns, so they merge to N
        assert_eq!(q, b"ATGNNCAT");
    }

    #[test]
    fn trailing_insertion_right_pads_from_reference_tail() {
        let b = block(vec![line(0, &[Cigar::Match(4), Cigar::Ins(2)], b"ATGCNN")]);
        let (r, q) = align_block(&b, b"ATGCAT", false).unwrap();
        assert_eq!(r, b"ATGC--AT");
        assert_eq!(q, b"ATGCNNNN");
    }
}
