//! C5: reads a SAM/BAM file via `rust_htslib::bam` (already a declared
//! dependency of the base crate) and groups consecutive records sharing a
//! QNAME into `Block`s, tagging each with a monotonically increasing `idx`
//! so downstream pipeline stages can restore input order after fan-out.

use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read};
use std::path::Path;

use crate::sam::types::{Block, SamHeader, SamLine};

pub struct SamGrouper {
    reader: bam::Reader,
    pending: Option<SamLine>,
    next_idx: usize,
    exhausted: bool,
}

impl SamGrouper {
    /// Opens `path` and returns the primary reference header alongside a
    /// streaming grouper. htslib auto-detects SAM vs BAM by content.
    pub fn open(path: &Path) -> Result<(SamHeader, SamGrouper)> {
        let reader = bam::Reader::from_path(path)
            .with_context(|| format!("opening SAM/BAM file {}", path.display()))?;

        let header_view = reader.header();
        let name = header_view
            .target_names()
            .first()
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let length = header_view.target_len(0).unwrap_or(0) as usize;
        let header = SamHeader { name, length };

        let grouper = SamGrouper { reader, pending: None, next_idx: 0, exhausted: false };
        Ok((header, grouper))
    }

    fn read_one(&mut self) -> Option<Result<SamLine>> {
        if self.exhausted {
            return None;
        }
        let mut record = bam::Record::new();
        match self.reader.read(&mut record) {
            None => {
                self.exhausted = true;
                None
            }
            Some(Err(e)) => {
                self.exhausted = true;
                Some(Err(e.into()))
            }
            Some(Ok(())) => {
                let qname = String::from_utf8_lossy(record.qname()).into_owned();
                let pos0 = record.pos().max(0) as usize;
                let cigar = record.cigar();
                let seq = record.seq().as_bytes();
                Some(Ok(SamLine { qname, pos0, cigar, seq }))
            }
        }
    }
}

impl Iterator for SamGrouper {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Result<Block>> {
        let mut current: Vec<SamLine> = Vec::new();

        if let Some(first) = self.pending.take() {
            current.push(first);
        }

        loop {
            match self.read_one() {
                None => break,
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(line)) => {
                    if current.is_empty() || current[0].qname == line.qname {
                        current.push(line);
                    } else {
                        self.pending = Some(line);
                        break;
                    }
                }
            }
        }

        if current.is_empty() {
            return None;
        }
        let idx = self.next_idx;
        self.next_idx += 1;
        Some(Ok(Block { records: current, idx }))
    }
}
