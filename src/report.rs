use crate::coverage::GeneCoverage;
use crate::error::QcResult;
use crate::metrics::{self, Metrics};
use crate::types::HashMap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Final aggregates of one run (or one shard).
#[derive(Debug, Default)]
pub struct Report {
    pub metrics: Metrics,
    pub exon_counts: HashMap<String, f64>,
    pub gene_counts: HashMap<String, f64>,
    pub gene_fragment_counts: HashMap<String, u64>,
    pub unique_gene_counts: HashMap<String, u64>,
    pub gene_coverage: Vec<GeneCoverage>,
    pub fragment_sizes: BTreeMap<u64, u64>,
    pub gc_samples: Vec<f64>,
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn merge_counts<V: Copy + std::ops::AddAssign + Default>(
    into: &mut HashMap<String, V>,
    from: &HashMap<String, V>,
) {
    for (k, v) in from {
        *into.entry(k.clone()).or_default() += *v;
    }
}

impl Report {
    /// Rates derived from the raw counters.
    pub fn rates(&self) -> BTreeMap<&'static str, f64> {
        let m = &self.metrics;
        let mapped = m.get(metrics::MAPPED_UNIQUE);
        let mut rates = BTreeMap::new();
        rates.insert("Mapping Rate", ratio(m.get(metrics::MAPPED), m.get(metrics::TOTAL)));
        rates.insert("Exonic Rate", ratio(m.get(metrics::EXONIC), mapped));
        rates.insert("Intronic Rate", ratio(m.get(metrics::INTRONIC), mapped));
        rates.insert("Intergenic Rate", ratio(m.get(metrics::INTERGENIC), mapped));
        rates.insert("Intragenic Rate", ratio(m.get(metrics::INTRAGENIC), mapped));
        rates.insert("Ambiguous Alignment Rate", ratio(m.get(metrics::AMBIGUOUS), mapped));
        rates.insert("rRNA Rate", ratio(m.get(metrics::RRNA), mapped));
        let end1 = m.get(metrics::END1_SENSE) + m.get(metrics::END1_ANTISENSE);
        let end2 = m.get(metrics::END2_SENSE) + m.get(metrics::END2_ANTISENSE);
        rates.insert("End 1 % Sense", 100.0 * ratio(m.get(metrics::END1_SENSE), end1));
        rates.insert("End 2 % Sense", 100.0 * ratio(m.get(metrics::END2_SENSE), end2));
        rates
    }

    pub fn fragment_size_mean(&self) -> Option<f64> {
        let n: u64 = self.fragment_sizes.values().sum();
        if n == 0 {
            return None;
        }
        let total: u64 = self.fragment_sizes.iter().map(|(size, count)| size * count).sum();
        Some(total as f64 / n as f64)
    }

    /// Combine the report of another shard into this one.
    pub fn merge(&mut self, other: Report) {
        self.metrics.merge(&other.metrics);
        merge_counts(&mut self.exon_counts, &other.exon_counts);
        merge_counts(&mut self.gene_counts, &other.gene_counts);
        merge_counts(&mut self.gene_fragment_counts, &other.gene_fragment_counts);
        merge_counts(&mut self.unique_gene_counts, &other.unique_gene_counts);
        self.gene_coverage.extend(other.gene_coverage);
        for (size, count) in other.fragment_sizes {
            *self.fragment_sizes.entry(size).or_insert(0) += count;
        }
        self.gc_samples.extend(other.gc_samples);
    }

    /// Write all tables next to `prefix`, returning the written paths.
    pub fn write_tsv(&self, prefix: &Path) -> QcResult<Vec<PathBuf>> {
        let path_for = |suffix: &str| {
            let mut name = prefix.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        let mut written = Vec::new();

        let path = path_for(".metrics.tsv");
        let mut w = BufWriter::new(File::create(&path)?);
        for (label, count) in self.metrics.iter() {
            writeln!(w, "{label}\t{count}")?;
        }
        for (label, rate) in self.rates() {
            writeln!(w, "{label}\t{rate:.6}")?;
        }
        if let Some(mean) = self.fragment_size_mean() {
            writeln!(w, "Average Fragment Length\t{mean:.2}")?;
        }
        w.flush()?;
        written.push(path);

        let path = path_for(".gene_reads.tsv");
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "gene_id\treads\tfragments\tunique_reads")?;
        let mut genes: Vec<&String> = self.gene_counts.keys().collect();
        genes.sort();
        for gene in genes {
            writeln!(
                w,
                "{}\t{}\t{}\t{}",
                gene,
                self.gene_counts[gene],
                self.gene_fragment_counts.get(gene).copied().unwrap_or(0),
                self.unique_gene_counts.get(gene).copied().unwrap_or(0),
            )?;
        }
        w.flush()?;
        written.push(path);

        let path = path_for(".exon_reads.tsv");
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "exon_id\treads")?;
        let mut exons: Vec<(&String, &f64)> = self.exon_counts.iter().collect();
        exons.sort_by(|a, b| a.0.cmp(b.0));
        for (exon, count) in exons {
            writeln!(w, "{exon}\t{count:.4}")?;
        }
        w.flush()?;
        written.push(path);

        let path = path_for(".gene_coverage.tsv");
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "gene_id\tlength\tmean\tmedian\tstd\tcv")?;
        for c in &self.gene_coverage {
            writeln!(
                w,
                "{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
                c.gene_id, c.length, c.mean, c.median, c.std_dev, c.cv
            )?;
        }
        w.flush()?;
        written.push(path);

        let path = path_for(".fragment_sizes.tsv");
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "fragment_size\tcount")?;
        for (size, count) in &self.fragment_sizes {
            writeln!(w, "{size}\t{count}")?;
        }
        w.flush()?;
        written.push(path);

        let path = path_for(".gc_content.tsv");
        let mut w = BufWriter::new(File::create(&path)?);
        for gc in &self.gc_samples {
            writeln!(w, "{gc:.6}")?;
        }
        w.flush()?;
        written.push(path);

        Ok(written)
    }
}
