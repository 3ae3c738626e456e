//! Data model for the SAM-to-pairwise-alignment engine (spec §3): `Block`,
//! `Insertion`, `AlignedPair`. Cigar operations are read straight from
//! `rust_htslib::bam::record::Cigar`, the same crate the base repo already
//! depends on for SAM/BAM record access.

use rust_htslib::bam::record::CigarStringView;

/// One SAM data record, reduced to the fields the aligner needs (spec §6:
/// "Only QNAME, RNAME, POS, CIGAR, SEQ are used by the core.").
pub struct SamLine {
    pub qname: String,
    /// 0-based reference start position (SAM POS - 1).
    pub pos0: usize,
    pub cigar: CigarStringView,
    pub seq: Vec<u8>,
}

/// A maximal run of consecutive SAM records sharing a query name.
pub struct Block {
    pub records: Vec<SamLine>,
    pub idx: usize,
}

impl Block {
    pub fn qname(&self) -> &str {
        &self.records[0].qname
    }
}

/// Primary reference name/length, read once from the SAM header.
pub struct SamHeader {
    pub name: String,
    pub length: usize,
}

/// One recorded `I` cigar op: a query insertion relative to the reference,
/// anchored at an absolute (0-based) reference cursor position.
#[derive(Clone, Copy, Debug)]
pub struct Insertion {
    pub start: usize,
    pub length: usize,
    pub row: usize,
}

/// A single reference/query pairwise alignment in MSA coordinates.
/// Invariant: `ref_seq.len() == query_seq.len()`.
pub struct AlignedPair {
    pub ref_seq: Vec<u8>,
    pub query_seq: Vec<u8>,
    pub ref_name: String,
    pub query_name: String,
    pub idx: usize,
}
