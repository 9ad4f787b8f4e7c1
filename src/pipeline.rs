use crate::alignment::{Alignment, extract_blocks};
use crate::annotation::Annotation;
use crate::bam_input::{BamInput, ReadFlags, to_alignment};
use crate::classify::{Classification, Classifier, ReadContext, build_classifier};
use crate::config::QcConfig;
use crate::coverage::BaseCoverage;
use crate::error::QcResult;
use crate::fasta::ReferenceSource;
use crate::feature::Feature;
use crate::fragments::FragmentSizeSampler;
use crate::metrics::{self, Aggregates};
use crate::report::Report;
use crate::types::{Coord, HashMap, RefId};
use crate::window::AnnotationWindow;
use anyhow::Result;
use rust_htslib::bam::Read as HtsRead;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Processing context for one coordinate-sorted alignment stream.
///
/// Owns the annotation window of the current chromosome and all aggregates.
/// Alignments must be fed in coordinate order; on a chromosome change the
/// previous window is dropped and its genes finalized.
pub struct Pipeline {
    config: QcConfig,
    annotation: HashMap<String, Vec<Feature>>,
    chromosome: Option<String>,
    window: AnnotationWindow,
    classifier: Box<dyn Classifier>,
    aggregates: Aggregates,
    coverage: BaseCoverage,
    fragments: FragmentSizeSampler,
    reference: Option<Box<dyn ReferenceSource>>,
    gc_samples: VecDeque<f64>,
}

impl Pipeline {
    pub fn new(config: QcConfig, annotation: Annotation) -> Self {
        let classifier = build_classifier(config.legacy, config.split_distance);
        let Annotation { features, gene_names } = annotation;
        Self {
            config,
            annotation: features,
            chromosome: None,
            window: AnnotationWindow::default(),
            classifier,
            aggregates: Aggregates::new(gene_names),
            coverage: BaseCoverage::new(),
            fragments: FragmentSizeSampler::disabled(),
            reference: None,
            gc_samples: VecDeque::new(),
        }
    }

    /// Enable fragment-size sampling against an exon-only annotation.
    pub fn with_fragment_exons(mut self, exons: HashMap<String, Vec<Feature>>) -> Self {
        self.fragments = FragmentSizeSampler::new(exons, self.config.fragment_samples);
        self
    }

    /// Enable GC sampling against a reference sequence.
    pub fn with_reference(mut self, reference: Box<dyn ReferenceSource>) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    pub fn metrics_mut(&mut self) -> &mut metrics::Metrics {
        &mut self.aggregates.metrics
    }

    pub fn coverage(&self) -> &BaseCoverage {
        &self.coverage
    }

    pub fn fragments(&self) -> &FragmentSizeSampler {
        &self.fragments
    }

    pub fn window(&self) -> &AnnotationWindow {
        &self.window
    }

    /// Classify one mapped alignment on `chromosome`.
    pub fn process(
        &mut self,
        alignment: &Alignment,
        chromosome: &str,
        high_quality: bool,
    ) -> QcResult<Classification> {
        if self.chromosome.as_deref() != Some(chromosome) {
            self.flush_chromosome();
            let features = self.annotation.remove(chromosome).unwrap_or_default();
            debug!(chromosome, features = features.len(), "entering chromosome");
            self.coverage.register_exons(&features);
            self.window = AnnotationWindow::new(features);
            self.chromosome = Some(chromosome.to_string());
        }

        let read_blocks = extract_blocks(alignment, chromosome, self.config.legacy)?;

        let aggregates = &mut self.aggregates;
        let coverage = &mut self.coverage;
        self.window.trim(alignment.position.max(0) as Coord, |gene| {
            coverage.compute(gene);
            aggregates.forget_gene(&gene.gene_id);
        });

        let read = ReadContext {
            alignment,
            chromosome,
            blocks: &read_blocks.blocks,
            aligned_size: read_blocks.aligned_size,
            high_quality,
            single_end: self.config.single_end,
            orientation: self.config.orientation,
            reference: self.reference.as_deref(),
        };
        let result = self
            .classifier
            .classify(&read, &self.window, &mut self.aggregates, &mut self.coverage);

        if self.fragments.is_active() && alignment.is_paired && alignment.mate_ref_id == alignment.ref_id {
            self.fragments.process(alignment, chromosome, &read_blocks.blocks);
        }
        if let Some(gc) = result.gc_sample {
            self.gc_samples.push_back(gc);
        }
        Ok(result)
    }

    /// Drop the current window, finalizing every gene still in it.
    pub fn flush_chromosome(&mut self) {
        let aggregates = &mut self.aggregates;
        let coverage = &mut self.coverage;
        let dropped = self.window.drop_all(|gene| {
            coverage.compute(gene);
            aggregates.forget_gene(&gene.gene_id);
        });
        if let Some(chrom) = &self.chromosome {
            debug!(chromosome = %chrom, dropped, "flushed annotation window");
        }
    }

    /// GC samples produced so far; each value is yielded once.
    pub fn drain_gc_samples(&mut self) -> impl Iterator<Item = f64> + '_ {
        self.gc_samples.drain(..)
    }

    pub fn finish(mut self) -> Report {
        self.flush_chromosome();
        info!(
            classifier = self.classifier.name(),
            genes_finalized = self.coverage.finalized_count(),
            "classification complete"
        );
        let gc_samples = self.gc_samples.drain(..).collect();
        let Aggregates {
            metrics,
            exon_counts,
            gene_counts,
            gene_fragment_counts,
            unique_gene_counts,
            ..
        } = self.aggregates;
        Report {
            metrics,
            exon_counts,
            gene_counts,
            gene_fragment_counts,
            unique_gene_counts,
            gene_coverage: std::mem::take(&mut self.coverage.summaries),
            fragment_sizes: self.fragments.into_histogram(),
            gc_samples,
        }
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    pub total_reads: u64,
    pub classified_reads: u64,
    pub malformed_reads: u64,
}

/// Stream a coordinate-sorted BAM through the pipeline.
pub fn run(bam: &mut BamInput, mut pipeline: Pipeline) -> Result<(Report, Stats)> {
    let mut stats = Stats::default();
    let config = pipeline.config.clone();
    let mut last_position: Option<(RefId, i64)> = None;

    let BamInput { ref_names, reader } = bam;
    for result in reader.records() {
        let record = result?;
        stats.total_reads += 1;
        let counter = pipeline.metrics_mut();
        counter.increment(metrics::TOTAL);

        let flags = ReadFlags::from_record(&record);
        if flags.qc_failed {
            counter.increment(metrics::QC_FAILED);
            continue;
        }
        if flags.unmapped {
            counter.increment(metrics::UNMAPPED);
            continue;
        }
        if flags.secondary {
            counter.increment(metrics::SECONDARY);
            continue;
        }
        if flags.supplementary {
            counter.increment(metrics::SUPPLEMENTARY);
            continue;
        }
        counter.increment(metrics::MAPPED);
        if flags.duplicate {
            counter.increment(metrics::DUPLICATE);
        }
        let unique = record.mapq() >= config.mapping_quality;
        if unique {
            counter.increment(metrics::MAPPED_UNIQUE);
        }
        let high_quality = unique
            && flags.mismatches <= config.base_mismatch
            && (config.single_end || flags.proper_pair);
        counter.increment(if high_quality { metrics::HIGH_QUALITY } else { metrics::LOW_QUALITY });

        let alignment = to_alignment(&record);
        if let Some((tid, pos)) = last_position
            && tid == alignment.ref_id
            && alignment.position < pos
        {
            warn!(query = %alignment.query_name, "input is not coordinate sorted");
        }
        last_position = Some((alignment.ref_id, alignment.position));

        let Some(chromosome) = usize::try_from(alignment.ref_id).ok().and_then(|i| ref_names.get(i)) else {
            continue;
        };
        match pipeline.process(&alignment, chromosome, high_quality) {
            Ok(_) => stats.classified_reads += 1,
            Err(e) => {
                stats.malformed_reads += 1;
                warn!(error = %e, "skipping alignment");
            }
        }
    }

    Ok((pipeline.finish(), stats))
}
