//! Sliding window over one chromosome's sorted annotation.
//!
//! Reads arrive sorted by position, so features that end before the current
//! read can never be hit again and are evicted from the front. Genes leaving
//! the window are handed to a finalizer exactly once.

use crate::feature::{Block, Feature, intersects};
use crate::types::Coord;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct AnnotationWindow {
    features: VecDeque<Feature>,
}

impl AnnotationWindow {
    /// Build a window from features sorted ascending by start.
    pub fn new(features: Vec<Feature>) -> Self {
        debug_assert!(features.windows(2).all(|w| w[0].start <= w[1].start));
        Self { features: features.into() }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Evict features ending before `position`, passing evicted genes to `on_gene_evicted`.
    /// Returns the number of features removed.
    pub fn trim<F>(&mut self, position: Coord, mut on_gene_evicted: F) -> usize
    where
        F: FnMut(&Feature),
    {
        let mut removed = 0;
        while let Some(front) = self.features.front() {
            if front.end >= position {
                break;
            }
            if let Some(feature) = self.features.pop_front() {
                if feature.is_gene() {
                    on_gene_evicted(&feature);
                }
                removed += 1;
            }
        }
        removed
    }

    /// Finalize every remaining gene and empty the window.
    pub fn drop_all<F>(&mut self, mut on_gene_evicted: F) -> usize
    where
        F: FnMut(&Feature),
    {
        let removed = self.features.len();
        for feature in self.features.drain(..) {
            if feature.is_gene() {
                on_gene_evicted(&feature);
            }
        }
        removed
    }

    /// Features overlapping `block`, in window order.
    pub fn intersect(&self, block: &Block) -> Vec<&Feature> {
        self.features
            .iter()
            .take_while(|f| f.start <= block.end)
            .filter(|f| intersects(f.interval(), block.interval()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Strand;

    fn block(start: Coord, end: Coord) -> Block {
        Block { chromosome: "chr1".into(), start, end, strand: Strand::Forward }
    }

    fn window() -> AnnotationWindow {
        AnnotationWindow::new(vec![
            Feature::gene("chr1", 10, 50, Strand::Forward, "g1"),
            Feature::exon("chr1", 10, 20, Strand::Forward, "g1", "e1"),
            Feature::exon("chr1", 40, 50, Strand::Forward, "g1", "e2"),
            Feature::gene("chr1", 100, 300, Strand::Reverse, "g2"),
            Feature::exon("chr1", 100, 150, Strand::Reverse, "g2", "e3"),
        ])
    }

    #[test]
    fn trim_evicts_features_ending_before_position() {
        let mut w = window();
        let mut evicted = Vec::new();
        let removed = w.trim(45, |g| evicted.push(g.gene_id.clone()));
        // g1 ends at 50 and blocks eviction of anything behind it.
        assert_eq!(removed, 0);
        let removed = w.trim(60, |g| evicted.push(g.gene_id.clone()));
        assert_eq!(removed, 3);
        assert_eq!(evicted, vec!["g1".to_string()]);
        assert!(w.iter().all(|f| f.end >= 60));
    }

    #[test]
    fn drop_finalizes_each_gene_once() {
        let mut w = window();
        let mut evicted = Vec::new();
        w.drop_all(|g| evicted.push(g.gene_id.clone()));
        assert!(w.is_empty());
        assert_eq!(evicted, vec!["g1".to_string(), "g2".to_string()]);
        w.drop_all(|g| evicted.push(g.gene_id.clone()));
        assert_eq!(evicted.len(), 2);
    }

    #[test]
    fn intersect_requires_real_overlap() {
        let w = window();
        let hits: Vec<_> = w.intersect(&block(20, 40)).iter().map(|f| f.feature_id.clone()).collect();
        assert_eq!(hits, vec!["g1".to_string()]);
        let hits: Vec<_> = w.intersect(&block(15, 18)).iter().map(|f| f.feature_id.clone()).collect();
        assert_eq!(hits, vec!["g1".to_string(), "e1".to_string()]);
    }

    #[test]
    fn intersect_is_idempotent() {
        let w = window();
        let b = block(120, 130);
        let first: Vec<Feature> = w.intersect(&b).into_iter().cloned().collect();
        let second: Vec<Feature> = w.intersect(&b).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
