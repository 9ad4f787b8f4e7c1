use crate::feature::Strand;
use crate::types::Coord;

#[derive(Debug, Clone)]
pub struct QcConfig {
    /// Minimum gap between blocks for the legacy classifier to call a read split.
    pub split_distance: Coord,
    /// Strand of the first mate relative to the transcript; `Unknown` for unstranded libraries.
    pub orientation: Strand,
    /// Use the legacy classifier and legacy aligned-size accounting.
    pub legacy: bool,
    pub single_end: bool,
    /// Minimum mapping quality for a read to count as high quality.
    pub mapping_quality: u8,
    /// Maximum NM for a read to count as high quality.
    pub base_mismatch: u32,
    /// Number of fragment-size samples to collect; 0 disables sampling.
    pub fragment_samples: u32,
}

impl QcConfig {
    /// Settings reproducing the legacy RNA-SeQC counts.
    pub fn legacy() -> Self {
        Self {
            legacy: true,
            ..Self::default()
        }
    }
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            split_distance: 100,
            orientation: Strand::Unknown,
            legacy: false,
            single_end: false,
            mapping_quality: 255,
            base_mismatch: 6,
            fragment_samples: 1_000_000,
        }
    }
}
