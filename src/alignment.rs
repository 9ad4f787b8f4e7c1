use crate::error::{QcError, QcResult};
use crate::feature::{Block, Strand};
use crate::types::{Coord, RefId};
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;

/// One alignment record, as supplied by the alignment source.
///
/// Positions follow BAM conventions: `position` and `mate_position` are 0-based.
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    pub query_name: String,
    /// 0-based reference sequence index.
    pub ref_id: RefId,
    /// 0-based leftmost aligned position.
    pub position: i64,
    /// 0-based reference sequence index of the mate.
    pub mate_ref_id: RefId,
    /// 0-based leftmost aligned position of the mate.
    pub mate_position: i64,
    /// CIGAR as `(length, SAM op code)` pairs.
    /// SAM op codes: 0=M, 1=I, 2=D, 3=N(intron), 4=S, 5=H, 6=P, 7==, 8=X.
    pub cigar: Vec<(u32, u8)>,
    pub insert_size: i64,
    /// Query read length in bases.
    pub read_length: u32,
    pub is_paired: bool,
    pub is_reverse: bool,
    pub is_mate_reverse: bool,
    pub is_first_in_pair: bool,
    pub is_duplicate: bool,
}

impl Alignment {
    /// 0-based exclusive end of the aligned reference span.
    pub fn position_end(&self) -> i64 {
        let consumed: i64 = self
            .cigar
            .iter()
            .filter(|(_, code)| {
                matches!(
                    op_kind(*code),
                    Some(
                        CigarKind::Match
                            | CigarKind::SequenceMatch
                            | CigarKind::SequenceMismatch
                            | CigarKind::Deletion
                            | CigarKind::Skip
                    )
                )
            })
            .map(|(len, _)| i64::from(*len))
            .sum();
        self.position + consumed
    }

    pub fn strand(&self) -> Strand {
        if self.is_reverse { Strand::Reverse } else { Strand::Forward }
    }
}

/// Map a SAM CIGAR op code to its kind; `None` for codes outside `MIDNSHP=X`.
pub fn op_kind(code: u8) -> Option<CigarKind> {
    match code {
        0 => Some(CigarKind::Match),
        1 => Some(CigarKind::Insertion),
        2 => Some(CigarKind::Deletion),
        3 => Some(CigarKind::Skip),
        4 => Some(CigarKind::SoftClip),
        5 => Some(CigarKind::HardClip),
        6 => Some(CigarKind::Pad),
        7 => Some(CigarKind::SequenceMatch),
        8 => Some(CigarKind::SequenceMismatch),
        _ => None,
    }
}

/// Map a CIGAR character to its SAM op code.
pub fn op_code(c: char) -> Option<u8> {
    "MIDNSHP=X".find(c).map(|i| i as u8)
}

/// Parse a textual CIGAR such as `50M100N50M` into `(length, op code)` pairs.
///
/// Unknown operation characters are kept as code `u8::MAX` so that block
/// extraction reports them.
pub fn parse_cigar(text: &str) -> Vec<(u32, u8)> {
    let mut ops = Vec::new();
    let mut len: u32 = 0;
    for c in text.chars() {
        if let Some(d) = c.to_digit(10) {
            len = len.saturating_mul(10).saturating_add(d);
        } else {
            ops.push((len, op_code(c).unwrap_or(u8::MAX)));
            len = 0;
        }
    }
    ops
}

/// Query length implied by the CIGAR: the sum of M/I/S/=/X lengths.
pub fn query_length(cigar: &[(u32, u8)]) -> u32 {
    cigar
        .iter()
        .filter(|(_, code)| {
            matches!(
                op_kind(*code),
                Some(
                    CigarKind::Match
                        | CigarKind::Insertion
                        | CigarKind::SoftClip
                        | CigarKind::SequenceMatch
                        | CigarKind::SequenceMismatch
                )
            )
        })
        .map(|(len, _)| *len)
        .sum()
}

/// Aligned blocks of one read plus its aligned size.
#[derive(Debug, Clone, Default)]
pub struct ReadBlocks {
    pub blocks: Vec<Block>,
    /// Sum of M/=/X lengths; legacy mode also adds soft clips.
    pub aligned_size: u32,
}

/// Split an alignment into gap-free aligned blocks.
///
/// Coordinates are returned as 1-based, half-open `[start, end)`.
/// `N` and `D` advance the reference without emitting a block; `I`, `H`
/// and `P` are ignored; `S` only counts towards the aligned size in legacy mode.
pub fn extract_blocks(alignment: &Alignment, chromosome: &str, legacy: bool) -> QcResult<ReadBlocks> {
    let strand = alignment.strand();
    let mut start = (alignment.position + 1).max(0) as Coord;
    let mut out = ReadBlocks::default();

    for &(len, code) in &alignment.cigar {
        let kind = op_kind(code).ok_or_else(|| QcError::MalformedAlignment {
            op: code,
            query_name: alignment.query_name.clone(),
        })?;
        match kind {
            CigarKind::Match | CigarKind::SequenceMatch | CigarKind::SequenceMismatch => {
                out.blocks.push(Block {
                    chromosome: chromosome.to_string(),
                    start,
                    end: start + Coord::from(len),
                    strand,
                });
                out.aligned_size += len;
                start += Coord::from(len);
            }
            CigarKind::Skip | CigarKind::Deletion => {
                start += Coord::from(len);
            }
            CigarKind::SoftClip => {
                if legacy {
                    out.aligned_size += len;
                }
            }
            CigarKind::HardClip | CigarKind::Pad | CigarKind::Insertion => {}
        }
    }

    Ok(out)
}
