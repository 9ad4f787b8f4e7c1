use crate::config::QcConfig;
use crate::feature::Strand;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stranded {
    /// First mate on the transcript strand
    Fr,
    /// First mate on the opposite strand (dUTP and similar protocols)
    Rf,
}

#[derive(Parser, Debug)]
#[command(
    name = "rnaqc-rs",
    about = "Classify RNA-seq alignments against a gene annotation and report QC metrics",
    version
)]
pub struct Args {
    /// Coordinate-sorted input BAM
    pub in_bam: PathBuf,

    /// Gene annotation (GTF) with gene and exon features
    #[arg(short = 'G', long = "gtf", value_name = "GTF")]
    pub gtf: PathBuf,

    /// Output prefix for the TSV reports
    #[arg(short = 'o', long = "out", value_name = "PREFIX")]
    pub out_prefix: PathBuf,

    /// Reference FASTA; enables GC content sampling
    #[arg(short = 'S', long = "fasta", value_name = "FASTA")]
    pub fasta: Option<PathBuf>,

    /// Exon BED used for fragment size sampling (default: exons of the GTF)
    #[arg(long, value_name = "BED")]
    pub bed: Option<PathBuf>,

    /// Library strandedness
    #[arg(long, value_enum)]
    pub stranded: Option<Stranded>,

    /// Reproduce the legacy RNA-SeQC counting rules
    #[arg(long)]
    pub legacy: bool,

    /// Input reads are single-ended
    #[arg(long)]
    pub unpaired: bool,

    /// Minimum mapping quality for high-quality reads
    #[arg(long, default_value_t = 255)]
    pub mapping_quality: u8,

    /// Maximum NM for high-quality reads
    #[arg(long, default_value_t = 6)]
    pub base_mismatch: u32,

    /// Minimum block gap for a legacy read to count as split
    #[arg(long, default_value_t = 100)]
    pub split_distance: u64,

    /// Number of fragment size samples to collect (0 disables)
    #[arg(long, default_value_t = 1_000_000)]
    pub fragment_samples: u32,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    pub fn config(&self) -> QcConfig {
        QcConfig {
            split_distance: self.split_distance,
            orientation: match self.stranded {
                Some(Stranded::Fr) => Strand::Forward,
                Some(Stranded::Rf) => Strand::Reverse,
                None => Strand::Unknown,
            },
            legacy: self.legacy,
            single_end: self.unpaired,
            mapping_quality: self.mapping_quality,
            base_mismatch: self.base_mismatch,
            fragment_samples: self.fragment_samples,
        }
    }
}
