//! Per-base exon coverage.
//!
//! Coverage from a read is first written to a per-read cache. The classifier
//! commits the cache for the genes it credits, and the rest is discarded by
//! `reset`. When a gene leaves the annotation window its committed coverage is
//! summarised by `compute` and released. Exons of the gene that no read
//! reached count as zero depth.

use crate::feature::Feature;
use crate::types::{Coord, HashMap, HashMapExt, HashSet, HashSetExt};
use tracing::warn;

#[derive(Debug, Clone)]
struct ExonDepth {
    start: Coord,
    depth: Vec<u32>,
}

impl ExonDepth {
    fn new(exon: &Feature) -> Self {
        Self {
            start: exon.start,
            depth: vec![0; exon.length() as usize],
        }
    }

    fn add(&mut self, start: Coord, end: Coord) {
        let lo = start.saturating_sub(self.start) as usize;
        let hi = (end.saturating_sub(self.start) as usize).min(self.depth.len());
        for d in self.depth.iter_mut().take(hi).skip(lo) {
            *d += 1;
        }
    }

    fn merge(&mut self, other: &ExonDepth) {
        for (d, o) in self.depth.iter_mut().zip(other.depth.iter()) {
            *d += o;
        }
    }
}

/// Depth statistics for one gene, computed over the concatenation of its exons.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneCoverage {
    pub gene_id: String,
    pub length: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub cv: f64,
}

type GeneDepths = HashMap<String, ExonDepth>;

#[derive(Debug, Default)]
pub struct BaseCoverage {
    cache: HashMap<String, GeneDepths>,
    committed: HashMap<String, GeneDepths>,
    /// gene_id -> (exon_id, length) of the current chromosome, in start order.
    layouts: HashMap<String, Vec<(String, usize)>>,
    /// (chromosome, gene_id) pairs already summarised.
    finalized: HashSet<(String, String)>,
    pub summaries: Vec<GeneCoverage>,
}

impl BaseCoverage {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            committed: HashMap::new(),
            layouts: HashMap::new(),
            finalized: HashSet::new(),
            summaries: Vec::new(),
        }
    }

    /// Record the exon set of every gene on a new chromosome.
    ///
    /// `features` must be sorted by start; repeated exon ids are kept once.
    pub fn register_exons<'a, I>(&mut self, features: I)
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        self.layouts.clear();
        for exon in features.into_iter().filter(|f| f.is_exon()) {
            let exons = self.layouts.entry(exon.gene_id.clone()).or_default();
            if exons.iter().all(|(id, _)| *id != exon.feature_id) {
                exons.push((exon.feature_id.clone(), exon.length() as usize));
            }
        }
    }

    /// Provisionally add coverage of `[start, end)` on `exon`.
    pub fn add(&mut self, exon: &Feature, start: Coord, end: Coord) {
        self.cache
            .entry(exon.gene_id.clone())
            .or_default()
            .entry(exon.feature_id.clone())
            .or_insert_with(|| ExonDepth::new(exon))
            .add(start, end);
    }

    /// Keep the cached coverage of `gene_id` for the current read.
    pub fn commit(&mut self, gene_id: &str) {
        let Some(cached) = self.cache.remove(gene_id) else {
            return;
        };
        let committed = self.committed.entry(gene_id.to_string()).or_default();
        for (exon_id, depth) in cached {
            match committed.get_mut(&exon_id) {
                Some(existing) => existing.merge(&depth),
                None => {
                    committed.insert(exon_id, depth);
                }
            }
        }
    }

    /// Discard coverage that was not committed for the current read.
    pub fn reset(&mut self) {
        self.cache.clear();
    }

    /// Summarise and release the committed coverage of `gene`.
    pub fn compute(&mut self, gene: &Feature) {
        let key = (gene.chromosome.clone(), gene.gene_id.clone());
        if !self.finalized.insert(key) {
            warn!(
                gene_id = %gene.gene_id,
                chromosome = %gene.chromosome,
                "gene coverage finalized more than once"
            );
            return;
        }
        let layout = self.layouts.remove(&gene.gene_id).unwrap_or_default();
        let Some(mut committed) = self.committed.remove(&gene.gene_id) else {
            return;
        };

        let mut depth: Vec<u32> = Vec::new();
        for (exon_id, length) in &layout {
            match committed.remove(exon_id) {
                Some(exon) => depth.extend(exon.depth),
                None => depth.extend(std::iter::repeat_n(0u32, *length)),
            }
        }
        // Exons never registered for this chromosome.
        let mut rest: Vec<ExonDepth> = committed.into_values().collect();
        rest.sort_by_key(|e| e.start);
        depth.extend(rest.into_iter().flat_map(|e| e.depth));

        if let Some(summary) = summarize(&gene.gene_id, depth) {
            self.summaries.push(summary);
        }
    }

    pub fn is_finalized(&self, chromosome: &str, gene_id: &str) -> bool {
        self.finalized.contains(&(chromosome.to_string(), gene_id.to_string()))
    }

    pub fn finalized_count(&self) -> usize {
        self.finalized.len()
    }
}

fn summarize(gene_id: &str, mut depth: Vec<u32>) -> Option<GeneCoverage> {
    if depth.is_empty() {
        return None;
    }
    let n = depth.len() as f64;
    let mean = depth.iter().map(|&d| f64::from(d)).sum::<f64>() / n;
    let var = depth
        .iter()
        .map(|&d| (f64::from(d) - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = var.sqrt();
    depth.sort_unstable();
    let mid = depth.len() / 2;
    let median = if depth.len() % 2 == 0 {
        (f64::from(depth[mid - 1]) + f64::from(depth[mid])) / 2.0
    } else {
        f64::from(depth[mid])
    };
    let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };
    Some(GeneCoverage {
        gene_id: gene_id.to_string(),
        length: depth.len(),
        mean,
        median,
        std_dev,
        cv,
    })
}
