//! Interval geometry and the annotation feature model.
//!
//! All intervals are 1-based and half-open: `[start, end)`. GTF ends are
//! inclusive, so the annotation loader stores `end + 1`.

use crate::types::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strand {
    Forward,
    Reverse,
    #[default]
    Unknown,
}

impl Strand {
    pub fn from_char(c: char) -> Self {
        match c {
            '+' => Strand::Forward,
            '-' => Strand::Reverse,
            _ => Strand::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Gene,
    Exon,
}

/// A gene or exon from the annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub chromosome: String,
    pub start: Coord,
    pub end: Coord,
    pub strand: Strand,
    pub kind: FeatureKind,
    pub gene_id: String,
    pub feature_id: String,
    pub ribosomal: bool,
}

impl Feature {
    pub fn gene(chromosome: &str, start: Coord, end: Coord, strand: Strand, gene_id: &str) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            strand,
            kind: FeatureKind::Gene,
            gene_id: gene_id.to_string(),
            feature_id: gene_id.to_string(),
            ribosomal: false,
        }
    }

    pub fn exon(
        chromosome: &str,
        start: Coord,
        end: Coord,
        strand: Strand,
        gene_id: &str,
        exon_id: &str,
    ) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            strand,
            kind: FeatureKind::Exon,
            gene_id: gene_id.to_string(),
            feature_id: exon_id.to_string(),
            ribosomal: false,
        }
    }

    pub fn with_ribosomal(mut self, ribosomal: bool) -> Self {
        self.ribosomal = ribosomal;
        self
    }

    pub fn is_gene(&self) -> bool {
        self.kind == FeatureKind::Gene
    }

    pub fn is_exon(&self) -> bool {
        self.kind == FeatureKind::Exon
    }

    pub fn length(&self) -> Coord {
        self.end.saturating_sub(self.start)
    }

    pub fn interval(&self) -> Interval {
        Interval { start: self.start, end: self.end }
    }
}

/// Bare `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Coord,
    pub end: Coord,
}

impl Interval {
    pub fn new(start: Coord, end: Coord) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> Coord {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// An aligned, gap-free segment of one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub chromosome: String,
    pub start: Coord,
    pub end: Coord,
    pub strand: Strand,
}

impl Block {
    pub fn len(&self) -> Coord {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn interval(&self) -> Interval {
        Interval { start: self.start, end: self.end }
    }
}

/// True when the two intervals share at least one base.
pub fn intersects(a: Interval, b: Interval) -> bool {
    overlap(a, b) > 0
}

/// Number of bases shared by the two intervals.
pub fn overlap(a: Interval, b: Interval) -> Coord {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    end.saturating_sub(start)
}

/// True when `feature` covers every base of `block`.
pub fn contains_block(feature: &Feature, block: &Block) -> bool {
    overlap(feature.interval(), block.interval()) == block.len()
}
