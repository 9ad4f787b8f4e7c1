use crate::error::{QcError, QcResult};
use crate::feature::{Feature, FeatureKind, Strand};
use crate::types::{HashMap, HashMapExt, HashSet, HashSetExt};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Genes and exons grouped by chromosome, each list sorted by start.
#[derive(Debug, Default)]
pub struct Annotation {
    pub features: HashMap<String, Vec<Feature>>,
    /// gene_id -> gene_name
    pub gene_names: HashMap<String, String>,
}

impl Annotation {
    pub fn from_features<I>(features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        let mut by_chrom: HashMap<String, Vec<Feature>> = HashMap::new();
        for f in features {
            by_chrom.entry(f.chromosome.clone()).or_default().push(f);
        }
        for list in by_chrom.values_mut() {
            sort_features(list);
        }
        Self { features: by_chrom, gene_names: HashMap::new() }
    }

    /// Exon-only copy of the annotation, used by fragment-size sampling.
    pub fn exons(&self) -> HashMap<String, Vec<Feature>> {
        self.features
            .iter()
            .map(|(chrom, list)| {
                let exons = list.iter().filter(|f| f.is_exon()).cloned().collect();
                (chrom.clone(), exons)
            })
            .collect()
    }

    pub fn feature_count(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }
}

/// Sort by start; genes precede exons starting at the same base.
fn sort_features(list: &mut [Feature]) {
    list.sort_by_key(|f| (f.start, f.kind != FeatureKind::Gene));
}

fn is_ribosomal_biotype(value: Option<String>) -> bool {
    value.is_some_and(|v| v == "rRNA")
}

/// Load gene and exon features from a GTF.
///
/// Coordinate conventions:
/// - GTF is 1-based inclusive.
/// - Features are stored as 1-based, half-open [start, end+1).
pub fn load_gtf(path: &Path) -> QcResult<Annotation> {
    let reader = File::open(path)?;
    let mut reader = noodles::gtf::io::Reader::new(BufReader::new(reader));

    let mut features: Vec<Feature> = Vec::new();
    let mut gene_names: HashMap<String, String> = HashMap::new();
    let mut exon_numbers: HashMap<String, u32> = HashMap::new();
    // (gene_id, exon_id or span); an exon shared by several transcripts is listed once per transcript.
    let mut seen_exons: HashSet<(String, String)> = HashSet::new();
    let mut repeated_exons = 0usize;

    for result in reader.record_bufs() {
        let record = result?;

        let feature_type: &[u8] = record.ty().as_ref();
        let kind = match feature_type {
            b"gene" => FeatureKind::Gene,
            b"exon" => FeatureKind::Exon,
            _ => continue,
        };

        let chromosome = record.reference_sequence_name().to_string();
        let strand = Strand::from_char(strand_to_char(record.strand()));

        let start = record.start().get() as u64;
        let end = record.end().get() as u64 + 1;

        let attrs = record.attributes();
        let gene_id = get_record_buf_attribute(attrs, b"gene_id")
            .ok_or_else(|| QcError::Annotation(format!("missing gene_id at {chromosome}:{start}")))?;
        let ribosomal = is_ribosomal_biotype(get_record_buf_attribute(attrs, b"gene_type"))
            || is_ribosomal_biotype(get_record_buf_attribute(attrs, b"gene_biotype"))
            || is_ribosomal_biotype(get_record_buf_attribute(attrs, b"transcript_type"));

        let feature = match kind {
            FeatureKind::Gene => {
                if let Some(name) = get_record_buf_attribute(attrs, b"gene_name") {
                    gene_names.insert(gene_id.clone(), name);
                }
                Feature::gene(&chromosome, start, end, strand, &gene_id)
            }
            FeatureKind::Exon => {
                let exon_id = get_record_buf_attribute(attrs, b"exon_id");
                let key = exon_id.clone().unwrap_or_else(|| format!("{start}-{end}"));
                if !seen_exons.insert((gene_id.clone(), key)) {
                    repeated_exons += 1;
                    continue;
                }
                let exon_id = match exon_id {
                    Some(id) => id,
                    None => {
                        let n = exon_numbers.entry(gene_id.clone()).or_insert(0);
                        *n += 1;
                        format!("{gene_id}_{n}")
                    }
                };
                Feature::exon(&chromosome, start, end, strand, &gene_id, &exon_id)
            }
        };
        features.push(feature.with_ribosomal(ribosomal));
    }

    if repeated_exons > 0 {
        debug!(repeated_exons, "skipped exon records repeated across transcripts");
    }
    let mut annotation = Annotation::from_features(features);
    annotation.gene_names = gene_names;
    info!(
        chromosomes = annotation.features.len(),
        features = annotation.feature_count(),
        "loaded annotation"
    );
    Ok(annotation)
}

/// Load exon intervals from a BED file for fragment-size sampling.
///
/// BED is 0-based half-open; intervals are shifted to 1-based half-open.
pub fn load_bed_exons(path: &Path) -> QcResult<HashMap<String, Vec<Feature>>> {
    let reader = BufReader::new(File::open(path)?);
    let mut exons = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') || line.starts_with("track") || line.starts_with("browser") {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(QcError::Annotation(format!(
                "{}:{}: expected at least 3 BED columns",
                path.display(),
                lineno + 1
            )));
        }
        let parse = |s: &str| {
            s.parse::<u64>().map_err(|_| {
                QcError::Annotation(format!("{}:{}: bad coordinate {s:?}", path.display(), lineno + 1))
            })
        };
        let start = parse(fields[1])? + 1;
        let end = parse(fields[2])? + 1;
        let name = fields
            .get(3)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{}:{}-{}", fields[0], start, end - 1));
        let strand = fields
            .get(5)
            .and_then(|s| s.chars().next())
            .map(Strand::from_char)
            .unwrap_or_default();
        exons.push(Feature::exon(fields[0], start, end, strand, &name, &name));
    }
    Ok(Annotation::from_features(exons).features)
}

fn get_record_buf_attribute(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Option<String> {
    let value = attrs.get(key)?;
    value.iter().next().map(|v| v.to_string())
}

fn strand_to_char(strand: noodles::gff::feature::record::Strand) -> char {
    use noodles::gff::feature::record::Strand;
    match strand {
        Strand::Forward => '+',
        Strand::Reverse => '-',
        Strand::None => '.',
        Strand::Unknown => '?',
    }
}
