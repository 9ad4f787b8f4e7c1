use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use rnaqc_rs::annotation::{load_bed_exons, load_gtf};
use rnaqc_rs::bam_input::open_bam;
use rnaqc_rs::cli::Args;
use rnaqc_rs::fasta::FastaDb;
use rnaqc_rs::pipeline::{self, Pipeline};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            if args.quiet {
                EnvFilter::new("warn")
            } else {
                EnvFilter::new("info")
            }
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = args.config();
    let annotation = load_gtf(&args.gtf)
        .with_context(|| format!("failed to load annotation {}", args.gtf.display()))?;
    let fragment_exons = match &args.bed {
        Some(path) => load_bed_exons(path)
            .with_context(|| format!("failed to load exon BED {}", path.display()))?,
        None => annotation.exons(),
    };

    let mut pipeline = Pipeline::new(config, annotation).with_fragment_exons(fragment_exons);
    if let Some(path) = &args.fasta {
        let fasta = FastaDb::load(path)?;
        tracing::info!(contigs = fasta.len(), "loaded reference {}", path.display());
        pipeline = pipeline.with_reference(Box::new(fasta));
    }

    let mut bam = open_bam(&args.in_bam)
        .with_context(|| format!("failed to open BAM {}", args.in_bam.display()))?;
    let (report, stats) = pipeline::run(&mut bam, pipeline)?;
    let written = report.write_tsv(&args.out_prefix)?;

    tracing::info!(
        total_reads = stats.total_reads,
        classified_reads = stats.classified_reads,
        malformed_reads = stats.malformed_reads,
        fragment_samples = report.fragment_sizes.values().sum::<u64>(),
        gc_samples = report.gc_samples.len(),
        outputs = written.len(),
        "rnaqc-rs: processing complete"
    );
    Ok(())
}
