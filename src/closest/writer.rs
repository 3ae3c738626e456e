//! CSV sink for the closest-N engine (spec §4.3 output formats). Receives
//! ranked results strictly in query-input order (order is restored by the
//! merger in `pipeline.rs` before reaching this writer).

use anyhow::Result;
use std::io::Write;

use crate::closest::rank::Hit;
use crate::closest::target_set::TargetSet;

pub struct CsvWriter<W: Write> {
    out: W,
    table: bool,
    header_written: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W, table: bool) -> CsvWriter<W> {
        CsvWriter { out, table, header_written: false }
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            if self.table {
                writeln!(self.out, "query,target,distance")?;
            } else {
                writeln!(self.out, "query,closest")?;
            }
            self.header_written = true;
        }
        Ok(())
    }

    /// Writes the ranked hits for one query. In table mode a query with no
    /// passing hits is omitted entirely; in list mode it is rendered as a
    /// trailing comma with an empty list (spec §8 scenario 3).
    pub fn write_query(&mut self, query_id: &str, targets: &TargetSet, hits: &[Hit]) -> Result<()> {
        self.write_header()?;

        if self.table {
            for hit in hits {
                let target_id = &targets.records[target_index(targets, hit.target_idx)].id;
                writeln!(self.out, "{query_id},{target_id},{}", hit.distance)?;
            }
        } else {
            let names: Vec<&str> = hits
                .iter()
                .map(|hit| targets.records[target_index(targets, hit.target_idx)].id.as_str())
                .collect();
            writeln!(self.out, "{query_id},{}", names.join(";"))?;
        }

        Ok(())
    }
}

/// `TargetSet.records` is built in ascending-idx order during load, so the
/// target's idx is also its slice position; kept as a named helper so the
/// assumption is documented at the one call site instead of scattered.
fn target_index(targets: &TargetSet, target_idx: usize) -> usize {
    debug_assert_eq!(targets.records[target_idx].idx, target_idx);
    target_idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closest::target_set::Record;
    use crate::codec::encode;
    use crate::distance::Distance;

    fn targets() -> TargetSet {
        TargetSet {
            records: vec![
                Record { id: "T1".into(), description: String::new(), seq: encode(b"AAAA").unwrap(), idx: 0 },
                Record { id: "T2".into(), description: String::new(), seq: encode(b"AAAA").unwrap(), idx: 1 },
            ],
        }
    }

    #[test]
    fn list_mode_empty_hits_renders_trailing_comma() {
        let targets = targets();
        let mut buf = Vec::new();
        let mut writer = CsvWriter::new(&mut buf, false);
        writer.write_query("Q1", &targets, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "query,closest\nQ1,\n");
    }

    #[test]
    fn table_mode_empty_hits_is_omitted() {
        let targets = targets();
        let mut buf = Vec::new();
        let mut writer = CsvWriter::new(&mut buf, true);
        writer.write_query("Q1", &targets, &[]).unwrap();
        writer
            .write_query("Q2", &targets, &[Hit { target_idx: 0, distance: Distance::Snp(0) }])
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "query,target,distance\nQ2,T1,0\n");
    }
}
