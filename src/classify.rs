//! Read classification against the annotation window.
//!
//! Two strategies share one contract: given a read's blocks and the current
//! window, decide whether the read is exonic, intronic, intergenic or
//! ambiguous, and credit genes, exons and coverage accordingly.
//!
//! * [`ExonClassifier`] credits only genes whose exons fully contain every
//!   block of the read.
//! * [`LegacyClassifier`] reproduces the historical RNA-SeQC 1.x counting,
//!   including its quirks, for runs that must match old numbers.

use crate::alignment::Alignment;
use crate::coverage::BaseCoverage;
use crate::fasta::ReferenceSource;
use crate::feature::{Block, Feature, Strand, overlap};
use crate::metrics::{self, Aggregates, ExonCollector, Metrics};
use crate::strand::read_strand;
use crate::types::{Coord, HashMap, HashMapExt};
use crate::window::AnnotationWindow;
use std::collections::{BTreeMap, BTreeSet};

/// Insert sizes accepted for GC sampling: `[min, max)`.
pub const GC_INSERT_SIZE_RANGE: std::ops::Range<u64> = 100..1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCategory {
    Exonic,
    Intronic,
    Intergenic,
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub category: ReadCategory,
    /// GC fraction of a completed read pair, when this read closed one.
    pub gc_sample: Option<f64>,
}

/// Everything a classifier needs to know about the current read.
pub struct ReadContext<'a> {
    pub alignment: &'a Alignment,
    pub chromosome: &'a str,
    pub blocks: &'a [Block],
    pub aligned_size: u32,
    pub high_quality: bool,
    pub single_end: bool,
    pub orientation: Strand,
    pub reference: Option<&'a dyn ReferenceSource>,
}

pub trait Classifier {
    fn name(&self) -> &'static str;

    fn classify(
        &mut self,
        read: &ReadContext<'_>,
        window: &AnnotationWindow,
        state: &mut Aggregates,
        coverage: &mut BaseCoverage,
    ) -> Classification;
}

/// Pick the strategy for a run.
pub fn build_classifier(legacy: bool, split_distance: Coord) -> Box<dyn Classifier> {
    if legacy {
        Box::new(LegacyClassifier { split_distance })
    } else {
        Box::new(ExonClassifier::default())
    }
}

fn count_unassigned(counter: &mut Metrics, intragenic: bool, high_quality: bool) -> ReadCategory {
    if intragenic {
        counter.increment(metrics::INTRONIC);
        counter.increment(metrics::INTRAGENIC);
        if high_quality {
            counter.increment(metrics::HQ_INTRONIC);
            counter.increment(metrics::HQ_INTRAGENIC);
        }
        ReadCategory::Intronic
    } else {
        counter.increment(metrics::INTERGENIC);
        if high_quality {
            counter.increment(metrics::HQ_INTERGENIC);
        }
        ReadCategory::Intergenic
    }
}

fn count_exonic(counter: &mut Metrics, high_quality: bool) -> ReadCategory {
    counter.increment(metrics::EXONIC);
    counter.increment(metrics::INTRAGENIC);
    if high_quality {
        counter.increment(metrics::HQ_EXONIC);
        counter.increment(metrics::HQ_INTRAGENIC);
    }
    ReadCategory::Exonic
}

/// Sense/antisense counters, only when the overlapped genes agree on a strand.
fn count_strandedness(
    counter: &mut Metrics,
    alignment: &Alignment,
    single_end: bool,
    transcript_plus: bool,
    transcript_minus: bool,
) {
    if !(transcript_plus ^ transcript_minus) || !(single_end || alignment.is_paired) {
        return;
    }
    let sense = if alignment.is_reverse { transcript_minus } else { transcript_plus };
    let label = match (single_end || alignment.is_first_in_pair, sense) {
        (true, true) => metrics::END1_SENSE,
        (true, false) => metrics::END1_ANTISENSE,
        (false, true) => metrics::END2_SENSE,
        (false, false) => metrics::END2_ANTISENSE,
    };
    counter.increment(label);
}

fn note_strand(feature: &Feature, plus: &mut bool, minus: &mut bool) {
    match feature.strand {
        Strand::Forward => *plus = true,
        Strand::Reverse => *minus = true,
        Strand::Unknown => {}
    }
}

#[derive(Debug, Clone)]
struct MateEntry {
    exon_id: String,
    end: i64,
}

/// Classifier crediting only genes that unambiguously contain every block.
#[derive(Debug, Default)]
pub struct ExonClassifier {
    gc_mates: HashMap<String, MateEntry>,
}

impl ExonClassifier {
    pub fn new() -> Self {
        Self { gc_mates: HashMap::new() }
    }

    fn sample_gc(&mut self, read: &ReadContext<'_>, exon_id: &str) -> Option<f64> {
        let reference = read.reference?;
        let aln = read.alignment;
        let end = aln.position_end();
        match self.gc_mates.remove(&aln.query_name) {
            None => {
                self.gc_mates.insert(
                    aln.query_name.clone(),
                    MateEntry { exon_id: exon_id.to_string(), end },
                );
                None
            }
            Some(mate) => {
                if mate.exon_id != exon_id || end <= mate.end || aln.position == aln.mate_position {
                    return None;
                }
                let start = (mate.end - i64::from(aln.read_length)).max(0);
                reference.gc_fraction(read.chromosome, start as u64, end as u64)
            }
        }
    }
}

impl Classifier for ExonClassifier {
    fn name(&self) -> &'static str {
        "exon"
    }

    fn classify(
        &mut self,
        read: &ReadContext<'_>,
        window: &AnnotationWindow,
        state: &mut Aggregates,
        coverage: &mut BaseCoverage,
    ) -> Classification {
        let aln = read.alignment;
        let strand = read_strand(aln, read.orientation);
        let mut block_genes: Vec<BTreeSet<String>> = Vec::with_capacity(read.blocks.len());
        let mut aligned_exons: BTreeSet<String> = BTreeSet::new();
        let mut collector = ExonCollector::new();
        let mut intragenic = false;
        let mut transcript_plus = false;
        let mut transcript_minus = false;
        let mut ribosomal = false;
        let mut exonic = false;
        let mut do_exon_metrics = false;

        for block in read.blocks {
            let mut genes = BTreeSet::new();
            for feature in window.intersect(block) {
                if strand != Strand::Unknown && strand != feature.strand {
                    continue;
                }
                note_strand(feature, &mut transcript_plus, &mut transcript_minus);
                if feature.is_exon() {
                    exonic = true;
                    let shared = overlap(feature.interval(), block.interval());
                    if shared == block.len() {
                        genes.insert(feature.gene_id.clone());
                        let dosage = shared as f64 / f64::from(read.aligned_size.max(1));
                        collector.add(&feature.gene_id, &feature.feature_id, dosage);
                        coverage.add(feature, block.start, block.end);
                        aligned_exons.insert(feature.feature_id.clone());
                    }
                } else {
                    intragenic = true;
                }
                if feature.ribosomal {
                    ribosomal = true;
                }
            }
            block_genes.push(genes);
        }

        if let Some((first, rest)) = block_genes.split_first() {
            let unambiguous = rest.iter().fold(first.clone(), |acc, genes| {
                acc.intersection(genes).cloned().collect()
            });
            for gene_id in &unambiguous {
                if read.high_quality {
                    if collector.has_gene(gene_id) {
                        state.credit_gene(gene_id, &aln.query_name, aln.is_duplicate);
                    }
                    collector.collect(gene_id, state);
                    coverage.commit(gene_id);
                }
                do_exon_metrics = true;
            }
            let hits_globin = unambiguous.iter().any(|g| metrics::is_globin(state.gene_name(g)));
            if !hits_globin {
                state.metrics.increment(metrics::NON_GLOBIN);
                if aln.is_duplicate {
                    state.metrics.increment(metrics::NON_GLOBIN_DUPLICATE);
                }
            }
        }

        let counter = &mut state.metrics;
        let category = if !exonic {
            count_unassigned(counter, intragenic, read.high_quality)
        } else if do_exon_metrics {
            count_exonic(counter, read.high_quality)
        } else {
            // Exon evidence spread over several genes: provisional credit is dropped.
            counter.increment(metrics::AMBIGUOUS);
            if read.high_quality {
                counter.increment(metrics::HQ_AMBIGUOUS);
            }
            ReadCategory::Ambiguous
        };
        if ribosomal {
            counter.increment(metrics::RRNA);
        }
        count_strandedness(counter, aln, read.single_end, transcript_plus, transcript_minus);
        coverage.reset();

        let mut gc_sample = None;
        if let Some(reference) = read.reference
            && reference.has_contig(read.chromosome)
            && read.high_quality
            && exonic
            && do_exon_metrics
            && aligned_exons.len() == 1
            && read.blocks.len() == 1
            && GC_INSERT_SIZE_RANGE.contains(&aln.insert_size.unsigned_abs())
            && let Some(exon_id) = aligned_exons.first()
        {
            gc_sample = self.sample_gc(read, exon_id);
        }

        Classification { category, gc_sample }
    }
}

/// Classifier reproducing the legacy RNA-SeQC counting rules.
#[derive(Debug, Clone)]
pub struct LegacyClassifier {
    /// Minimum gap between consecutive blocks for a read to count as split.
    pub split_distance: Coord,
}

impl LegacyClassifier {
    fn is_split(&self, blocks: &[Block]) -> bool {
        blocks
            .windows(2)
            .any(|w| w[1].start.saturating_sub(w[0].end) >= self.split_distance)
    }
}

impl Classifier for LegacyClassifier {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn classify(
        &mut self,
        read: &ReadContext<'_>,
        window: &AnnotationWindow,
        state: &mut Aggregates,
        coverage: &mut BaseCoverage,
    ) -> Classification {
        let aln = read.alignment;
        let split = self.is_split(read.blocks);
        let span = Block {
            chromosome: read.chromosome.to_string(),
            start: (aln.position + 1).max(0) as Coord,
            end: (aln.position_end() + 1).max(0) as Coord,
            strand: aln.strand(),
        };
        let results = window.intersect(&span);
        let strand = read_strand(aln, read.orientation);
        let read_length = f64::from(aln.read_length.max(1));

        let mut intragenic = false;
        let mut transcript_plus = false;
        let mut transcript_minus = false;
        let mut ribosomal = false;
        let mut do_exon_metrics = false;
        let mut exonic = false;
        let mut junction = false;
        let mut not_exonic = false;
        let mut not_split = false;

        for gene in &results {
            // The historical tool resets this for every overlapping feature.
            not_split = false;
            if !gene.is_gene() {
                continue;
            }
            let mut exon: Option<&Feature> = None;
            let mut found_exon = false;
            let mut transcript_intron = false;
            let mut transcript_exon = false;
            let mut split_dosage: BTreeMap<&str, f64> = BTreeMap::new();

            note_strand(gene, &mut transcript_plus, &mut transcript_minus);
            for block in read.blocks {
                if strand != Strand::Unknown && strand != gene.strand {
                    continue;
                }
                intragenic = true;
                if block.start >= gene.end {
                    not_exonic = true;
                }

                found_exon = false;
                for candidate in &results {
                    if !candidate.is_exon() || candidate.gene_id != gene.gene_id {
                        continue;
                    }
                    let shared = overlap(candidate.interval(), block.interval());
                    if shared == 0 {
                        continue;
                    }
                    if gene.ribosomal {
                        ribosomal = true;
                    }
                    if shared == block.len() {
                        exon = Some(*candidate);
                        transcript_exon = true;
                        found_exon = true;
                        coverage.add(candidate, block.start, block.end);
                        break;
                    }
                    transcript_intron = true;
                }

                if split && !not_split {
                    match exon {
                        Some(e) if found_exon => {
                            *split_dosage.entry(e.feature_id.as_str()).or_insert(0.0) +=
                                block.len() as f64 / read_length;
                        }
                        _ => not_split = true,
                    }
                }
            }

            if found_exon && let Some(exon) = exon {
                if read.high_quality {
                    if split && !not_split {
                        for (exon_id, dosage) in &split_dosage {
                            state.add_exon_dosage(exon_id, *dosage);
                        }
                    } else {
                        state.add_exon_dosage(&exon.feature_id, 1.0);
                    }
                    state.credit_gene(&exon.gene_id, &aln.query_name, aln.is_duplicate);
                    coverage.commit(&exon.gene_id);
                }
                do_exon_metrics = true;
            }
            if transcript_intron && transcript_exon {
                junction = true;
            }
            if transcript_exon {
                exonic = true;
            }
        }

        let counter = &mut state.metrics;
        let category = if not_exonic || junction || !exonic {
            count_unassigned(counter, intragenic, read.high_quality)
        } else if do_exon_metrics {
            if split && !not_split {
                counter.increment(metrics::SPLIT);
            }
            count_exonic(counter, read.high_quality)
        } else {
            // Intragenic reads that matched no exon cleanly are exonic by legacy convention.
            count_exonic(counter, read.high_quality)
        };
        if ribosomal {
            counter.increment(metrics::RRNA);
        }
        count_strandedness(counter, aln, read.single_end, transcript_plus, transcript_minus);
        coverage.reset();

        Classification { category, gc_sample: None }
    }
}
