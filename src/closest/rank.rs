//! Ranking logic for the closest-N engine (spec §4.3): distance to every
//! target, threshold cutoff, top-N truncation, stable tie-break by
//! ascending target input index.

use anyhow::Result;
use rayon::prelude::*;

use crate::closest::target_set::{Record, TargetSet};
use crate::distance::{self, Distance, Metric};

/// A single ranked hit: the target's input index and its distance to the query.
pub struct Hit {
    pub target_idx: usize,
    pub distance: Distance,
}

/// Ranks every target against `query` under `metric`, applies the
/// threshold (if any) then the top-N truncation (if any), in that order
/// per spec §4.3. `threshold` disabled by `None` or a negative value
/// (mirrors the `-1.0`-disables sentinel used throughout gofasta's own
/// test suite); `n == 0` disables top-N truncation.
pub fn rank(query: &Record, targets: &TargetSet, metric: Metric, n: usize, threshold: Option<f64>) -> Result<Vec<Hit>> {
    let mut hits: Vec<Hit> = targets
        .records
        .par_iter()
        .map(|target| -> Result<Hit> {
            let d = distance::distance(&query.seq, &target.seq, metric)?;
            Ok(Hit { target_idx: target.idx, distance: d })
        })
        .collect::<Result<Vec<_>>>()?;

    hits.sort_by(|a, b| {
        a.distance
            .as_f64()
            .total_cmp(&b.distance.as_f64())
            .then(a.target_idx.cmp(&b.target_idx))
    });

    if let Some(t) = threshold {
        if t >= 0.0 {
            hits.retain(|h| h.distance.as_f64() <= t);
        }
    }

    if n > 0 && hits.len() > n {
        hits.truncate(n);
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closest::target_set::TargetSet;
    use crate::codec::encode;

    fn target(id: &str, seq: &str, idx: usize) -> Record {
        Record { id: id.to_owned(), description: String::new(), seq: encode(seq.as_bytes()).unwrap(), idx }
    }

    fn query(seq: &str) -> Record {
        Record { id: "Q".to_owned(), description: String::new(), seq: encode(seq.as_bytes()).unwrap(), idx: 0 }
    }

    #[test]
    fn scenario_closest_n_raw_top2() {
        let targets = TargetSet {
            records: vec![
                target("T1", "ATGATC", 0),
                target("T2", "ATGATG", 1),
                target("T3", "ATTAGG", 2),
                target("T4", "ATTATG", 3),
                target("T5", "ATTATT", 4),
            ],
        };

        let q1 = query("ATGATG");
        let hits = rank(&q1, &targets, Metric::Raw, 2, None).unwrap();
        let names: Vec<usize> = hits.iter().map(|h| h.target_idx).collect();
        assert_eq!(names, vec![1, 0]); // T2;T1

        let q3 = query("ATTATT");
        let hits = rank(&q3, &targets, Metric::Raw, 2, None).unwrap();
        let names: Vec<usize> = hits.iter().map(|h| h.target_idx).collect();
        assert_eq!(names, vec![4, 3]); // T5;T4
    }

    #[test]
    fn threshold_then_truncate_order() {
        let targets = TargetSet {
            records: vec![target("T1", "AAAA", 0), target("T2", "AAAT", 1), target("T3", "AATT", 2)],
        };
        let q = query("AAAA");
        // snp distances: T1=0, T2=1, T3=2
        let hits = rank(&q, &targets, Metric::Snp, 5, Some(1.0)).unwrap();
        let idxs: Vec<usize> = hits.iter().map(|h| h.target_idx).collect();
        assert_eq!(idxs, vec![0, 1]);
    }

    #[test]
    fn zero_threshold_and_zero_n_emits_all() {
        let targets = TargetSet {
            records: vec![target("T1", "AAAA", 0), target("T2", "AAAT", 1)],
        };
        let q = query("AAAA");
        let hits = rank(&q, &targets, Metric::Snp, 0, None).unwrap();
        assert_eq!(hits.len(), 2);
    }
}
