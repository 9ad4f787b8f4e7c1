//! rnaqc-rs: RNA-seq alignment quality control against a gene annotation.
//!
//! # Library usage
//!
//! ```no_run
//! use rnaqc_rs::{Pipeline, QcConfig};
//! use rnaqc_rs::annotation::load_gtf;
//! use rnaqc_rs::alignment::{Alignment, parse_cigar};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let annotation = load_gtf(Path::new("genes.gtf"))?;
//! let exons = annotation.exons();
//! let mut pipeline = Pipeline::new(QcConfig::default(), annotation).with_fragment_exons(exons);
//!
//! // Alignments must arrive in coordinate order.
//! let aln = Alignment {
//!     query_name: "read1".into(),
//!     position: 1_000,
//!     cigar: parse_cigar("76M"),
//!     read_length: 76,
//!     ..Default::default()
//! };
//! pipeline.process(&aln, "chr1", true)?;
//!
//! let report = pipeline.finish();
//! report.write_tsv(Path::new("sample"))?;
//! # Ok(())
//! # }
//! ```

pub mod alignment;
pub mod annotation;
pub mod bam_input;
pub mod classify;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod error;
pub mod fasta;
pub mod feature;
pub mod fragments;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod strand;
pub mod types;
pub mod window;

// Flat re-exports for the most commonly used public types.
pub use alignment::{Alignment, ReadBlocks, extract_blocks};
pub use annotation::Annotation;
pub use classify::{Classification, Classifier, ReadCategory};
pub use config::QcConfig;
pub use error::{QcError, QcResult};
pub use feature::{Block, Feature, FeatureKind, Strand};
pub use pipeline::Pipeline;
pub use report::Report;
