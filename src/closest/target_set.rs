//! C3 (the target-side half) and the `TargetSet`/`Record` data model
//! (spec §3). Targets are loaded eagerly and shared read-only across
//! worker threads; queries are streamed one at a time by the pipeline.

use anyhow::{Context, Result};
use bio::io::fasta;
use std::path::Path;

use crate::codec::{self, EncodedSequence};

/// A single sequence record carrying its 0-based input position, used to
/// restore output order on the sink side.
pub struct Record {
    pub id: String,
    pub description: String,
    pub seq: EncodedSequence,
    pub idx: usize,
}

fn split_id_description(record: &fasta::Record) -> (String, String) {
    let id = record.id().to_owned();
    let description = record.desc().unwrap_or_default().to_owned();
    (id, description)
}

fn encode_record(record: fasta::Record, idx: usize) -> Result<Record> {
    let (id, description) = split_id_description(&record);
    let seq = codec::encode(record.seq())
        .with_context(|| format!("encoding sequence '{id}' (record #{idx})"))?;
    Ok(Record { id, description, seq, idx })
}

/// An indexed, immutable collection of target `Record`s, loaded once and
/// shared read-only across worker threads.
pub struct TargetSet {
    pub records: Vec<Record>,
}

impl TargetSet {
    pub fn load(path: &Path) -> Result<TargetSet> {
        let reader = fasta::Reader::from_file(path)
            .with_context(|| format!("opening target FASTA {path:?}"))?;

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("parsing target record #{idx}"))?;
            records.push(encode_record(record, idx)?);
        }
        Ok(TargetSet { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A streaming iterator over query records from a FASTA file, assigning a
/// monotonically increasing `idx` to each one in arrival order.
pub struct QueryReader {
    reader: fasta::Records<std::io::BufReader<std::fs::File>>,
    next_idx: usize,
}

impl QueryReader {
    pub fn from_path(path: &Path) -> Result<QueryReader> {
        let reader = fasta::Reader::from_file(path)
            .with_context(|| format!("opening query FASTA {path:?}"))?;
        Ok(QueryReader { reader: reader.records(), next_idx: 0 })
    }
}

impl Iterator for QueryReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        let result = self.reader.next()?;
        let idx = self.next_idx;
        self.next_idx += 1;
        Some(match result.with_context(|| format!("parsing query record #{idx}")) {
            Ok(record) => encode_record(record, idx),
            Err(e) => Err(e),
        })
    }
}
