//! Pairwise distance kernels (C2): `raw`, `snp`, `tn93` over encoded
//! nucleotide masks produced by [`crate::codec`].

use clap::ValueEnum;
use std::fmt;

use crate::codec::{BASE_A, BASE_C, BASE_G, BASE_T};
use crate::error::PipelineError;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Raw,
    Snp,
    Tn93,
}

/// Result of a pairwise distance computation. `Snp` is always an exact
/// integer count; `Raw`/`Tn93` are floating point and may be `+inf` when
/// the metric is undefined for the input pair (spec §4.2).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Distance {
    Raw(f64),
    Snp(u64),
    Tn93(f64),
}

impl Distance {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Distance::Raw(d) | Distance::Tn93(d) => d,
            Distance::Snp(d) => d as f64,
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Raw(d) | Distance::Tn93(d) => write!(f, "{d:.9}"),
            Distance::Snp(d) => write!(f, "{d}"),
        }
    }
}

fn is_ambiguous(mask: u8) -> bool {
    mask.count_ones() != 1
}

/// Computes the distance between two encoded, equal-length sequences under
/// `metric`. Fails with [`PipelineError::LengthMismatch`] when the lengths
/// differ.
pub fn distance(q: &[u8], t: &[u8], metric: Metric) -> Result<Distance, PipelineError> {
    if q.len() != t.len() {
        return Err(PipelineError::LengthMismatch {
            message: format!("sequences have lengths {} and {}", q.len(), t.len()),
        });
    }

    match metric {
        Metric::Raw => Ok(Distance::Raw(raw(q, t))),
        Metric::Snp => Ok(Distance::Snp(snp(q, t))),
        Metric::Tn93 => Ok(Distance::Tn93(tn93(q, t))),
    }
}

fn valid_unambiguous_pairs<'a>(q: &'a [u8], t: &'a [u8]) -> impl Iterator<Item = (u8, u8)> + 'a {
    q.iter()
        .zip(t.iter())
        .filter(|&(&qm, &tm)| qm != 0 && tm != 0)
        .filter(|&(&qm, &tm)| !is_ambiguous(qm) && !is_ambiguous(tm))
        .map(|(&qm, &tm)| (qm, tm))
}

fn raw(q: &[u8], t: &[u8]) -> f64 {
    let mut valid_sites = 0u64;
    let mut substitutions = 0u64;
    for (qm, tm) in valid_unambiguous_pairs(q, t) {
        valid_sites += 1;
        if qm != tm {
            substitutions += 1;
        }
    }
    if valid_sites == 0 {
        f64::INFINITY
    } else {
        substitutions as f64 / valid_sites as f64
    }
}

fn snp(q: &[u8], t: &[u8]) -> u64 {
    valid_unambiguous_pairs(q, t).filter(|&(qm, tm)| qm != tm).count() as u64
}

fn is_purine(mask: u8) -> bool {
    mask == BASE_A || mask == BASE_G
}

fn is_pyrimidine(mask: u8) -> bool {
    mask == BASE_C || mask == BASE_T
}

fn tn93(q: &[u8], t: &[u8]) -> f64 {
    let mut valid_sites = 0u64;
    let mut p1 = 0u64; // A<->G transitions
    let mut p2 = 0u64; // C<->T transitions
    let mut transversions = 0u64;
    let mut freq = [0u64; 4]; // indexed by base_index(), A C G T

    for (qm, tm) in valid_unambiguous_pairs(q, t) {
        valid_sites += 1;
        freq[base_index(qm)] += 1;
        freq[base_index(tm)] += 1;

        if qm != tm {
            if is_purine(qm) && is_purine(tm) {
                p1 += 1;
            } else if is_pyrimidine(qm) && is_pyrimidine(tm) {
                p2 += 1;
            } else {
                transversions += 1;
            }
        }
    }

    if valid_sites == 0 {
        return f64::INFINITY;
    }

    let total = (2 * valid_sites) as f64;
    let pi_a = freq[0] as f64 / total;
    let pi_c = freq[1] as f64 / total;
    let pi_g = freq[2] as f64 / total;
    let pi_t = freq[3] as f64 / total;

    let pi_r = pi_a + pi_g;
    let pi_y = pi_c + pi_t;

    let p1 = p1 as f64 / valid_sites as f64;
    let p2 = p2 as f64 / valid_sites as f64;
    let q_prop = transversions as f64 / valid_sites as f64;

    let k1 = 2.0 * pi_a * pi_g / pi_r;
    let k2 = 2.0 * pi_c * pi_t / pi_y;
    let k3 = 2.0 * (pi_r * pi_y - pi_a * pi_g * pi_y / pi_r - pi_c * pi_t * pi_r / pi_y);

    if k1 == 0.0 || k2 == 0.0 || k3 == 0.0 || !k1.is_finite() || !k2.is_finite() || !k3.is_finite() {
        return f64::INFINITY;
    }

    let term1 = 1.0 - (p1 / k1) * (pi_r / (2.0 * pi_a * pi_g)) - q_prop / (2.0 * pi_r);
    let term2 = 1.0 - (p2 / k2) * (pi_y / (2.0 * pi_c * pi_t)) - q_prop / (2.0 * pi_y);
    let term3 = 1.0 - q_prop / (2.0 * pi_r * pi_y);

    if term1 <= 0.0 || term2 <= 0.0 || term3 <= 0.0 {
        return f64::INFINITY;
    }

    -k1 * term1.ln() - k2 * term2.ln() - k3 * term3.ln()
}

fn base_index(mask: u8) -> usize {
    match mask {
        BASE_A => 0,
        BASE_C => 1,
        BASE_G => 2,
        BASE_T => 3,
        _ => unreachable!("base_index called on ambiguous or gap mask"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;

    #[test]
    fn length_mismatch_errors() {
        let q = encode(b"ATG").unwrap();
        let t = encode(b"AT").unwrap();
        assert!(matches!(distance(&q, &t, Metric::Raw), Err(PipelineError::LengthMismatch { .. })));
    }

    #[test]
    fn identical_sequences_have_zero_distance() {
        let q = encode(b"ATGATC").unwrap();
        for metric in [Metric::Raw, Metric::Snp, Metric::Tn93] {
            let d = distance(&q, &q, metric).unwrap();
            assert_eq!(d.as_f64(), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let q = encode(b"ATGATG").unwrap();
        let t = encode(b"ATTAGG").unwrap();
        for metric in [Metric::Raw, Metric::Snp, Metric::Tn93] {
            let qt = distance(&q, &t, metric).unwrap().as_f64();
            let tq = distance(&t, &q, metric).unwrap().as_f64();
            assert!((qt - tq).abs() < 1e-12);
        }
    }

    #[test]
    fn gaps_and_ambiguity_are_excluded_from_snp() {
        let q = encode(b"AN-T").unwrap();
        let t = encode(b"AAAT").unwrap();
        // site 0: A/A match; site 1: N ambiguous, excluded; site 2: gap, excluded; site 3: T/T match
        assert_eq!(snp(&q, &t), 0);
    }

    #[test]
    fn raw_is_undefined_when_no_valid_sites() {
        let q = encode(b"NN--").unwrap();
        let t = encode(b"NN--").unwrap();
        assert_eq!(raw(&q, &t), f64::INFINITY);
    }

    #[test]
    fn display_formats_nine_decimals_for_raw_and_integer_for_snp() {
        assert_eq!(format!("{}", Distance::Raw(0.1)), "0.100000000");
        assert_eq!(format!("{}", Distance::Snp(5)), "5");
    }
}
