use crate::alignment::Alignment;
use crate::feature::Strand;

/// Transcript strand implied by a read under the library orientation.
///
/// `orientation` is the strand of the first mate relative to the transcript.
/// Second mates of directional protocols are inverted relative to the first.
pub fn resolve_read_strand(orientation: Strand, is_reverse: bool, is_first_in_pair: bool) -> Strand {
    if orientation == Strand::Unknown {
        return Strand::Unknown;
    }
    let mut target = is_reverse;
    if (orientation == Strand::Forward) ^ is_first_in_pair {
        target = !target;
    }
    if target { Strand::Reverse } else { Strand::Forward }
}

pub fn read_strand(alignment: &Alignment, orientation: Strand) -> Strand {
    resolve_read_strand(orientation, alignment.is_reverse, alignment.is_first_in_pair)
}
