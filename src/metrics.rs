use crate::types::{HashMap, HashMapExt, HashSet};
use std::collections::BTreeMap;

pub const EXONIC: &str = "Exonic Reads";
pub const INTRONIC: &str = "Intronic Reads";
pub const INTERGENIC: &str = "Intergenic Reads";
pub const INTRAGENIC: &str = "Intragenic Reads";
pub const AMBIGUOUS: &str = "Ambiguous Reads";
pub const HQ_EXONIC: &str = "HQ Exonic Reads";
pub const HQ_INTRONIC: &str = "HQ Intronic Reads";
pub const HQ_INTERGENIC: &str = "HQ Intergenic Reads";
pub const HQ_INTRAGENIC: &str = "HQ Intragenic Reads";
pub const HQ_AMBIGUOUS: &str = "HQ Ambiguous Reads";
pub const SPLIT: &str = "Split Reads";
pub const RRNA: &str = "rRNA Reads";
pub const NON_GLOBIN: &str = "Non-Globin Reads";
pub const NON_GLOBIN_DUPLICATE: &str = "Non-Globin Duplicate Reads";
pub const END1_SENSE: &str = "End 1 Sense";
pub const END1_ANTISENSE: &str = "End 1 Antisense";
pub const END2_SENSE: &str = "End 2 Sense";
pub const END2_ANTISENSE: &str = "End 2 Antisense";

pub const TOTAL: &str = "Total Reads";
pub const UNMAPPED: &str = "Unmapped Reads";
pub const MAPPED: &str = "Mapped Reads";
pub const MAPPED_UNIQUE: &str = "Mapped Unique Reads";
pub const DUPLICATE: &str = "Duplicate Reads";
pub const HIGH_QUALITY: &str = "High Quality Reads";
pub const LOW_QUALITY: &str = "Low Quality Reads";
pub const SECONDARY: &str = "Alternative Alignments";
pub const SUPPLEMENTARY: &str = "Chimeric Reads";
pub const QC_FAILED: &str = "Failed Vendor QC";

/// Genes excluded from the non-globin read counters.
pub const BLACKLISTED_GLOBINS: [&str; 12] = [
    "HBA1", "HBA2", "HBB", "HBD", "HBG1", "HBG2", "HBE1", "HBM", "HBQ1", "HBZ", "HBBP1", "HBZP1",
];

pub fn is_globin(gene_name: &str) -> bool {
    BLACKLISTED_GLOBINS.contains(&gene_name)
}

/// Named read counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    counts: BTreeMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, label: &str) {
        self.add(label, 1);
    }

    pub fn add(&mut self, label: &str, n: u64) {
        match self.counts.get_mut(label) {
            Some(c) => *c += n,
            None => {
                self.counts.insert(label.to_string(), n);
            }
        }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn merge(&mut self, other: &Metrics) {
        for (label, n) in other.iter() {
            self.add(label, n);
        }
    }
}

/// All per-run state mutated by the classifiers.
#[derive(Debug, Default)]
pub struct Aggregates {
    pub metrics: Metrics,
    pub exon_counts: HashMap<String, f64>,
    pub gene_counts: HashMap<String, f64>,
    pub gene_fragment_counts: HashMap<String, u64>,
    pub unique_gene_counts: HashMap<String, u64>,
    /// gene_id -> query names already credited to that gene.
    pub fragment_tracker: HashMap<String, HashSet<String>>,
    /// gene_id -> gene name, used for the globin blacklist.
    pub gene_names: HashMap<String, String>,
}

impl Aggregates {
    pub fn new(gene_names: HashMap<String, String>) -> Self {
        Self { gene_names, ..Default::default() }
    }

    /// Credit one fragment to `gene_id` unless `query_name` was already counted for it.
    pub fn credit_fragment(&mut self, gene_id: &str, query_name: &str) {
        let seen = self.fragment_tracker.entry(gene_id.to_string()).or_default();
        if seen.insert(query_name.to_string()) {
            *self.gene_fragment_counts.entry(gene_id.to_string()).or_insert(0) += 1;
        }
    }

    /// Gene and fragment credit shared by both classifiers.
    pub fn credit_gene(&mut self, gene_id: &str, query_name: &str, is_duplicate: bool) {
        *self.gene_counts.entry(gene_id.to_string()).or_insert(0.0) += 1.0;
        self.credit_fragment(gene_id, query_name);
        if !is_duplicate {
            *self.unique_gene_counts.entry(gene_id.to_string()).or_insert(0) += 1;
        }
    }

    pub fn add_exon_dosage(&mut self, exon_id: &str, dosage: f64) {
        *self.exon_counts.entry(exon_id.to_string()).or_insert(0.0) += dosage;
    }

    pub fn gene_name<'a>(&'a self, gene_id: &'a str) -> &'a str {
        self.gene_names.get(gene_id).map(String::as_str).unwrap_or(gene_id)
    }

    /// Release the fragment tracking state of a gene that left the window.
    pub fn forget_gene(&mut self, gene_id: &str) {
        self.fragment_tracker.remove(gene_id);
    }
}

/// Exon dosage staged during classification; released per gene once the
/// read's gene assignment is known.
#[derive(Debug, Default)]
pub struct ExonCollector {
    staged: HashMap<String, Vec<(String, f64)>>,
}

impl ExonCollector {
    pub fn new() -> Self {
        Self { staged: HashMap::new() }
    }

    pub fn add(&mut self, gene_id: &str, exon_id: &str, dosage: f64) {
        self.staged
            .entry(gene_id.to_string())
            .or_default()
            .push((exon_id.to_string(), dosage));
    }

    pub fn has_gene(&self, gene_id: &str) -> bool {
        self.staged.get(gene_id).is_some_and(|v| !v.is_empty())
    }

    /// Move the staged dosage of `gene_id` into the exon counts.
    pub fn collect(&mut self, gene_id: &str, aggregates: &mut Aggregates) {
        if let Some(entries) = self.staged.remove(gene_id) {
            for (exon_id, dosage) in entries {
                aggregates.add_exon_dosage(&exon_id, dosage);
            }
        }
    }
}
