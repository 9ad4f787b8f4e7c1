use crate::alignment::{Alignment, query_length};
use anyhow::Result;
use rust_htslib::bam;
use rust_htslib::bam::Read as HtsRead;
use rust_htslib::bam::record::{Aux, Record};
use std::path::Path;

pub struct BamInput {
    /// Target names in header order, indexed by reference id.
    pub ref_names: Vec<String>,
    pub reader: bam::Reader,
}

pub fn open_bam(path: &Path) -> Result<BamInput> {
    let reader = bam::Reader::from_path(path)?;
    let ref_names: Vec<String> = reader
        .header()
        .target_names()
        .iter()
        .map(|n| String::from_utf8_lossy(n).to_string())
        .collect();
    Ok(BamInput { ref_names, reader })
}

/// Flag and tag summary used to filter records before classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadFlags {
    pub unmapped: bool,
    pub secondary: bool,
    pub supplementary: bool,
    pub qc_failed: bool,
    pub duplicate: bool,
    pub proper_pair: bool,
    /// NM tag; 0 when absent.
    pub mismatches: u32,
}

impl ReadFlags {
    pub fn from_record(record: &Record) -> Self {
        Self {
            unmapped: record.is_unmapped() || record.pos() < 0,
            secondary: record.is_secondary(),
            supplementary: record.is_supplementary(),
            qc_failed: record.is_quality_check_failed(),
            duplicate: record.is_duplicate(),
            proper_pair: record.is_proper_pair(),
            mismatches: edit_distance(record),
        }
    }
}

fn edit_distance(record: &Record) -> u32 {
    match record.aux(b"NM") {
        Ok(Aux::U8(v)) => u32::from(v),
        Ok(Aux::U16(v)) => u32::from(v),
        Ok(Aux::U32(v)) => v,
        Ok(Aux::I8(v)) => v.max(0) as u32,
        Ok(Aux::I16(v)) => v.max(0) as u32,
        Ok(Aux::I32(v)) => v.max(0) as u32,
        _ => 0,
    }
}

/// Convert an htslib record into the core's alignment view.
///
/// The CIGAR is decoded from its raw BAM encoding so that op codes outside
/// `MIDNSHP=X` reach block extraction instead of aborting here. Records
/// stored without SEQ take their read length from the CIGAR.
pub fn to_alignment(record: &Record) -> Alignment {
    let cigar: Vec<(u32, u8)> = record
        .raw_cigar()
        .iter()
        .map(|&op| (op >> 4, (op & 0xf) as u8))
        .collect();
    let read_length = match record.seq_len() {
        0 => query_length(&cigar),
        n => n as u32,
    };
    Alignment {
        query_name: String::from_utf8_lossy(record.qname()).to_string(),
        ref_id: record.tid(),
        position: record.pos(),
        mate_ref_id: record.mtid(),
        mate_position: record.mpos(),
        cigar,
        insert_size: record.insert_size(),
        read_length,
        is_paired: record.is_paired(),
        is_reverse: record.is_reverse(),
        is_mate_reverse: record.is_mate_reverse(),
        is_first_in_pair: record.is_first_in_template(),
        is_duplicate: record.is_duplicate(),
    }
}
