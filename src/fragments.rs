//! Fragment-size sampling from read pairs whose mates sit in a single exon.
//!
//! Both mates must be fully contained in the same exon, so the insert size
//! reported by the aligner equals the fragment length on the transcript.

use crate::alignment::Alignment;
use crate::feature::{Block, Feature, contains_block};
use crate::types::{Coord, HashMap, HashMapExt};
use crate::window::AnnotationWindow;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone)]
struct MateEntry {
    exon_id: String,
    end: i64,
}

#[derive(Debug)]
pub struct FragmentSizeSampler {
    /// Exon windows per chromosome; released once the sample budget is spent.
    windows: Option<HashMap<String, AnnotationWindow>>,
    mates: HashMap<String, MateEntry>,
    histogram: BTreeMap<u64, u64>,
    remaining: u32,
}

impl FragmentSizeSampler {
    pub fn new(exons_by_chromosome: HashMap<String, Vec<Feature>>, budget: u32) -> Self {
        let windows = (budget > 0).then(|| {
            exons_by_chromosome
                .into_iter()
                .map(|(chrom, features)| (chrom, AnnotationWindow::new(features)))
                .collect()
        });
        Self {
            windows,
            mates: HashMap::new(),
            histogram: BTreeMap::new(),
            remaining: budget,
        }
    }

    /// A sampler that never samples.
    pub fn disabled() -> Self {
        Self::new(HashMap::new(), 0)
    }

    pub fn is_active(&self) -> bool {
        self.windows.is_some()
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn histogram(&self) -> &BTreeMap<u64, u64> {
        &self.histogram
    }

    pub fn into_histogram(self) -> BTreeMap<u64, u64> {
        self.histogram
    }

    /// Feed one alignment; returns the fragment size when this read completed a sample.
    pub fn process(&mut self, alignment: &Alignment, chromosome: &str, blocks: &[Block]) -> Option<u64> {
        let window = self.windows.as_mut()?.get_mut(chromosome)?;
        window.trim(alignment.position.max(0) as Coord, |_| {});

        let mut exon_id: Option<&str> = None;
        for block in blocks {
            let hits = window.intersect(block);
            let [hit] = *hits.as_slice() else {
                return None;
            };
            if !contains_block(hit, block) {
                return None;
            }
            match exon_id {
                None => exon_id = Some(hit.feature_id.as_str()),
                Some(id) if id != hit.feature_id => return None,
                Some(_) => {}
            }
        }
        let exon_id = exon_id?.to_string();
        let end = alignment.position_end();

        let Some(mate) = self.mates.get(&alignment.query_name) else {
            self.mates
                .insert(alignment.query_name.clone(), MateEntry { exon_id, end });
            return None;
        };
        if mate.exon_id != exon_id {
            return None;
        }
        // The downstream mate must be reverse with a forward upstream mate, must
        // extend past the mate's end and must not share its start.
        if alignment.is_mate_reverse
            || !alignment.is_reverse
            || end <= mate.end
            || alignment.position == alignment.mate_position
        {
            return None;
        }

        let size = alignment.insert_size.unsigned_abs();
        *self.histogram.entry(size).or_insert(0) += 1;
        self.mates.remove(&alignment.query_name);
        self.remaining -= 1;
        if self.remaining == 0 {
            info!(samples = self.histogram.values().sum::<u64>(), "fragment size sampling complete");
            self.windows = None;
            self.mates.clear();
        }
        Some(size)
    }
}
