//! Classification scenarios driven through the public pipeline API.

use rnaqc_rs::alignment::parse_cigar;
use rnaqc_rs::annotation::load_gtf;
use rnaqc_rs::fasta::FastaDb;
use rnaqc_rs::metrics;
use rnaqc_rs::types::{HashMap, HashMapExt};
use rnaqc_rs::{Alignment, Annotation, Feature, Pipeline, QcConfig, ReadCategory, Strand};
use std::io::Write;

fn single_gene() -> Annotation {
    Annotation::from_features([
        Feature::gene("chr1", 100, 1000, Strand::Forward, "g1"),
        Feature::exon("chr1", 100, 500, Strand::Forward, "g1", "e1"),
    ])
}

fn two_genes() -> Annotation {
    Annotation::from_features([
        Feature::gene("chr1", 100, 400, Strand::Forward, "g1"),
        Feature::exon("chr1", 100, 300, Strand::Forward, "g1", "e1"),
        Feature::gene("chr1", 500, 900, Strand::Forward, "g2"),
        Feature::exon("chr1", 500, 800, Strand::Forward, "g2", "e2"),
    ])
}

fn read(name: &str, pos: i64, cigar: &str) -> Alignment {
    let cigar = parse_cigar(cigar);
    let read_length: u32 = cigar.iter().filter(|(_, op)| matches!(op, 0 | 1 | 4 | 7 | 8)).map(|(l, _)| *l).sum();
    Alignment {
        query_name: name.to_string(),
        position: pos,
        cigar,
        read_length,
        ..Default::default()
    }
}

fn paired(name: &str, pos: i64, mate_pos: i64, reverse: bool) -> Alignment {
    let insert = if reverse { -200 } else { 200 };
    Alignment {
        mate_position: mate_pos,
        insert_size: insert,
        is_paired: true,
        is_reverse: reverse,
        is_mate_reverse: !reverse,
        is_first_in_pair: !reverse,
        ..read(name, pos, "50M")
    }
}

#[test]
fn read_inside_one_exon_credits_gene_and_exon() {
    let mut p = Pipeline::new(QcConfig::default(), single_gene());
    let out = p.process(&read("r1", 149, "50M"), "chr1", true).unwrap();
    assert_eq!(out.category, ReadCategory::Exonic);

    let report = p.finish();
    assert_eq!(report.metrics.get(metrics::EXONIC), 1);
    assert_eq!(report.metrics.get(metrics::HQ_EXONIC), 1);
    assert_eq!(report.metrics.get(metrics::NON_GLOBIN), 1);
    assert_eq!(report.gene_counts["g1"], 1.0);
    assert_eq!(report.exon_counts["e1"], 1.0);
    assert_eq!(report.gene_fragment_counts["g1"], 1);
    assert_eq!(report.unique_gene_counts["g1"], 1);
}

#[test]
fn low_quality_read_is_counted_but_not_credited() {
    let mut p = Pipeline::new(QcConfig::default(), single_gene());
    p.process(&read("r1", 149, "50M"), "chr1", false).unwrap();
    let report = p.finish();
    assert_eq!(report.metrics.get(metrics::EXONIC), 1);
    assert_eq!(report.metrics.get(metrics::HQ_EXONIC), 0);
    assert!(report.gene_counts.is_empty());
    assert!(report.exon_counts.is_empty());
}

#[test]
fn mates_of_one_fragment_count_once_per_gene() {
    let mut p = Pipeline::new(QcConfig::default(), single_gene());
    p.process(&paired("frag", 149, 299, false), "chr1", true).unwrap();
    p.process(&paired("frag", 299, 149, true), "chr1", true).unwrap();
    let report = p.finish();
    assert_eq!(report.gene_counts["g1"], 2.0);
    assert_eq!(report.gene_fragment_counts["g1"], 1);
}

#[test]
fn blocks_in_exons_of_different_genes_are_ambiguous() {
    let mut p = Pipeline::new(QcConfig::default(), two_genes());
    let out = p.process(&read("r1", 249, "40M300N40M"), "chr1", true).unwrap();
    assert_eq!(out.category, ReadCategory::Ambiguous);

    let report = p.finish();
    assert_eq!(report.metrics.get(metrics::AMBIGUOUS), 1);
    assert_eq!(report.metrics.get(metrics::HQ_AMBIGUOUS), 1);
    assert_eq!(report.metrics.get(metrics::EXONIC), 0);
    assert!(report.gene_counts.is_empty());
    assert!(report.exon_counts.is_empty());
}

#[test]
fn read_between_genes_is_intergenic() {
    let mut p = Pipeline::new(QcConfig::default(), two_genes());
    let out = p.process(&read("r1", 419, "50M"), "chr1", true).unwrap();
    assert_eq!(out.category, ReadCategory::Intergenic);
    assert_eq!(p.finish().metrics.get(metrics::INTERGENIC), 1);
}

#[test]
fn globin_reads_are_excluded_from_non_globin_counts() {
    let mut annotation = single_gene();
    let mut names = HashMap::new();
    names.insert("g1".to_string(), "HBB".to_string());
    annotation.gene_names = names;

    let mut p = Pipeline::new(QcConfig::default(), annotation);
    p.process(&read("r1", 149, "50M"), "chr1", true).unwrap();
    let report = p.finish();
    assert_eq!(report.metrics.get(metrics::EXONIC), 1);
    assert_eq!(report.metrics.get(metrics::NON_GLOBIN), 0);
}

#[test]
fn stranded_library_ignores_opposite_strand_genes() {
    let config = QcConfig { orientation: Strand::Reverse, ..QcConfig::default() };
    let mut p = Pipeline::new(config, single_gene());
    // First mate, forward: transcript strand is reverse under an rf library.
    let mut aln = read("r1", 149, "50M");
    aln.is_paired = true;
    aln.is_first_in_pair = true;
    let out = p.process(&aln, "chr1", true).unwrap();
    assert_eq!(out.category, ReadCategory::Intergenic);
}

#[test]
fn legacy_mode_counts_split_reads() {
    let annotation = Annotation::from_features([
        Feature::gene("chr1", 100, 1000, Strand::Forward, "g1"),
        Feature::exon("chr1", 100, 200, Strand::Forward, "g1", "e1"),
        Feature::exon("chr1", 400, 500, Strand::Forward, "g1", "e2"),
    ]);
    let mut p = Pipeline::new(QcConfig::legacy(), annotation);
    let out = p.process(&read("r1", 149, "50M200N50M"), "chr1", true).unwrap();
    assert_eq!(out.category, ReadCategory::Exonic);
    let report = p.finish();
    assert_eq!(report.metrics.get(metrics::SPLIT), 1);
    assert_eq!(report.gene_counts["g1"], 1.0);
}

#[test]
fn exonic_pair_in_one_exon_yields_gc_sample() {
    // G over [0, 249), A afterwards.
    let seq: Vec<u8> = (0..1000).map(|i| if i < 249 { b'G' } else { b'A' }).collect();
    let reference = FastaDb::from_sequences([("chr1".to_string(), seq)]);
    let mut p = Pipeline::new(QcConfig::default(), single_gene()).with_reference(Box::new(reference));

    let first = p.process(&paired("frag", 149, 299, false), "chr1", true).unwrap();
    assert_eq!(first.gc_sample, None);
    let second = p.process(&paired("frag", 299, 149, true), "chr1", true).unwrap();
    let gc = second.gc_sample.expect("pair should close a GC sample");
    assert!((gc - 0.5).abs() < 1e-9);

    let drained: Vec<f64> = p.drain_gc_samples().collect();
    assert_eq!(drained.len(), 1);
    assert!(p.finish().gc_samples.is_empty());
}

#[test]
fn gc_sampling_skips_out_of_range_inserts() {
    let reference = FastaDb::from_sequences([("chr1".to_string(), vec![b'G'; 1000])]);
    let mut p = Pipeline::new(QcConfig::default(), single_gene()).with_reference(Box::new(reference));
    let mut a = paired("frag", 149, 299, false);
    let mut b = paired("frag", 299, 149, true);
    a.insert_size = 50;
    b.insert_size = -50;
    p.process(&a, "chr1", true).unwrap();
    assert_eq!(p.process(&b, "chr1", true).unwrap().gc_sample, None);
}

#[test]
fn pair_inside_one_exon_records_fragment_size() {
    let annotation = single_gene();
    let exons = annotation.exons();
    let mut p = Pipeline::new(QcConfig::default(), annotation).with_fragment_exons(exons);
    p.process(&paired("frag", 149, 299, false), "chr1", true).unwrap();
    p.process(&paired("frag", 299, 149, true), "chr1", true).unwrap();

    let report = p.finish();
    assert_eq!(report.fragment_sizes.get(&200), Some(&1));
    assert_eq!(report.fragment_size_mean(), Some(200.0));
}

#[test]
fn fragment_sampling_stops_at_budget() {
    let annotation = single_gene();
    let exons = annotation.exons();
    let config = QcConfig { fragment_samples: 1, ..QcConfig::default() };
    let mut p = Pipeline::new(config, annotation).with_fragment_exons(exons);
    for name in ["a", "b"] {
        p.process(&paired(name, 149, 299, false), "chr1", true).unwrap();
    }
    for name in ["a", "b"] {
        p.process(&paired(name, 299, 149, true), "chr1", true).unwrap();
    }
    assert!(!p.fragments().is_active());
    assert_eq!(p.finish().fragment_sizes.values().sum::<u64>(), 1);
}

fn ribosomal_gene() -> Annotation {
    Annotation::from_features([
        Feature::gene("chr1", 100, 1000, Strand::Forward, "rg").with_ribosomal(true),
        Feature::exon("chr1", 100, 500, Strand::Forward, "rg", "re").with_ribosomal(true),
    ])
}

#[test]
fn ribosomal_gene_counts_rrna_reads() {
    for config in [QcConfig::default(), QcConfig::legacy()] {
        let mut p = Pipeline::new(config, ribosomal_gene());
        p.process(&read("r1", 149, "50M"), "chr1", true).unwrap();
        let report = p.finish();
        assert_eq!(report.metrics.get(metrics::RRNA), 1);
        assert_eq!(report.metrics.get(metrics::EXONIC), 1);
    }
}

#[test]
fn non_ribosomal_read_is_not_rrna() {
    let mut p = Pipeline::new(QcConfig::default(), single_gene());
    p.process(&read("r1", 149, "50M"), "chr1", true).unwrap();
    assert_eq!(p.finish().metrics.get(metrics::RRNA), 0);
}

#[test]
fn mates_on_a_forward_gene_count_sense_and_antisense() {
    let mut p = Pipeline::new(QcConfig::default(), single_gene());
    p.process(&paired("frag", 149, 299, false), "chr1", true).unwrap();
    p.process(&paired("frag", 299, 149, true), "chr1", true).unwrap();
    let report = p.finish();
    assert_eq!(report.metrics.get(metrics::END1_SENSE), 1);
    assert_eq!(report.metrics.get(metrics::END1_ANTISENSE), 0);
    assert_eq!(report.metrics.get(metrics::END2_ANTISENSE), 1);
    assert_eq!(report.metrics.get(metrics::END2_SENSE), 0);
    assert!((report.rates()["End 1 % Sense"] - 100.0).abs() < 1e-9);
}

#[test]
fn reverse_read_on_reverse_gene_is_sense() {
    let annotation = Annotation::from_features([
        Feature::gene("chr1", 100, 1000, Strand::Reverse, "g1"),
        Feature::exon("chr1", 100, 500, Strand::Reverse, "g1", "e1"),
    ]);
    let config = QcConfig { single_end: true, ..QcConfig::default() };
    let mut p = Pipeline::new(config, annotation);
    let mut aln = read("r1", 149, "50M");
    aln.is_reverse = true;
    p.process(&aln, "chr1", true).unwrap();
    assert_eq!(p.finish().metrics.get(metrics::END1_SENSE), 1);
}

#[test]
fn genes_on_both_strands_skip_strandedness_counters() {
    let annotation = Annotation::from_features([
        Feature::gene("chr1", 100, 1000, Strand::Forward, "plus"),
        Feature::exon("chr1", 100, 500, Strand::Forward, "plus", "e_plus"),
        Feature::gene("chr1", 100, 1000, Strand::Reverse, "minus"),
        Feature::exon("chr1", 100, 500, Strand::Reverse, "minus", "e_minus"),
    ]);
    let mut p = Pipeline::new(QcConfig::default(), annotation);
    p.process(&paired("frag", 149, 299, false), "chr1", true).unwrap();
    let report = p.finish();
    for label in [metrics::END1_SENSE, metrics::END1_ANTISENSE, metrics::END2_SENSE, metrics::END2_ANTISENSE] {
        assert_eq!(report.metrics.get(label), 0, "{label}");
    }
}

#[test]
fn unpaired_read_without_single_end_skips_strandedness_counters() {
    let mut p = Pipeline::new(QcConfig::default(), single_gene());
    p.process(&read("r1", 149, "50M"), "chr1", true).unwrap();
    assert_eq!(p.finish().metrics.get(metrics::END1_SENSE), 0);
}

#[test]
fn duplicate_reads_count_as_non_globin_duplicates() {
    let mut p = Pipeline::new(QcConfig::default(), single_gene());
    let mut dup = read("r1", 149, "50M");
    dup.is_duplicate = true;
    p.process(&dup, "chr1", true).unwrap();
    p.process(&read("r2", 149, "50M"), "chr1", true).unwrap();
    let report = p.finish();
    assert_eq!(report.metrics.get(metrics::NON_GLOBIN), 2);
    assert_eq!(report.metrics.get(metrics::NON_GLOBIN_DUPLICATE), 1);
    assert_eq!(report.gene_counts["g1"], 2.0);
    assert_eq!(report.unique_gene_counts["g1"], 1);
}

#[test]
fn duplicate_globin_read_is_not_a_non_globin_duplicate() {
    let mut annotation = single_gene();
    let mut names = HashMap::new();
    names.insert("g1".to_string(), "HBA1".to_string());
    annotation.gene_names = names;
    let mut p = Pipeline::new(QcConfig::default(), annotation);
    let mut dup = read("r1", 149, "50M");
    dup.is_duplicate = true;
    p.process(&dup, "chr1", true).unwrap();
    assert_eq!(p.finish().metrics.get(metrics::NON_GLOBIN_DUPLICATE), 0);
}

#[test]
fn legacy_split_read_with_intronic_first_block_credits_last_exon() {
    let annotation = Annotation::from_features([
        Feature::gene("chr1", 100, 1000, Strand::Forward, "g1"),
        Feature::exon("chr1", 100, 200, Strand::Forward, "g1", "e1"),
        Feature::exon("chr1", 400, 500, Strand::Forward, "g1", "e2"),
    ]);
    let mut p = Pipeline::new(QcConfig::legacy(), annotation);
    // Blocks [230, 250) in the intron and [400, 450) in e2, 150 bases apart.
    let out = p.process(&read("r1", 229, "20M150N50M"), "chr1", true).unwrap();
    assert_eq!(out.category, ReadCategory::Exonic);

    let report = p.finish();
    assert_eq!(report.exon_counts["e2"], 1.0);
    assert_eq!(report.exon_counts.get("e1"), None);
    assert_eq!(report.gene_counts["g1"], 1.0);
    // The split flag is re-armed by the exon result that follows the gene.
    assert_eq!(report.metrics.get(metrics::SPLIT), 1);
}

#[test]
fn shared_transcript_exon_from_gtf_is_credited_once() {
    let gtf = "\
chr1\tsrc\tgene\t100\t500\t.\t+\t.\tgene_id \"G1\";
chr1\tsrc\texon\t100\t500\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; exon_id \"E1\";
chr1\tsrc\texon\t100\t500\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T2\"; exon_id \"E1\";
";
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(gtf.as_bytes()).unwrap();
    let annotation = load_gtf(file.path()).unwrap();

    let mut p = Pipeline::new(QcConfig::default(), annotation);
    p.process(&read("r1", 149, "50M"), "chr1", true).unwrap();
    let report = p.finish();
    assert_eq!(report.exon_counts["E1"], 1.0);
    assert_eq!(report.gene_counts["G1"], 1.0);
    let coverage = &report.gene_coverage[0];
    assert_eq!(coverage.length, 401);
    assert!((coverage.mean - 50.0 / 401.0).abs() < 1e-9);
}

#[test]
fn gene_coverage_spans_exons_without_reads() {
    let annotation = Annotation::from_features([
        Feature::gene("chr1", 100, 1000, Strand::Forward, "g1"),
        Feature::exon("chr1", 100, 200, Strand::Forward, "g1", "e1"),
        Feature::exon("chr1", 800, 900, Strand::Forward, "g1", "e2"),
    ]);
    let mut p = Pipeline::new(QcConfig::default(), annotation);
    p.process(&read("r1", 99, "100M"), "chr1", true).unwrap();
    let report = p.finish();
    let coverage = &report.gene_coverage[0];
    assert_eq!(coverage.length, 200);
    assert!((coverage.mean - 0.5).abs() < 1e-9);
    assert!((coverage.median - 0.5).abs() < 1e-9);
}
