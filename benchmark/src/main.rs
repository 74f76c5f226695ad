mod output;

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use docbench::{
    BenchConfig, PhaseCounts, RunReport, ServiceOverrides, StoreAdapter, run_pipeline,
};
use output::OutputRow;

#[derive(Parser, Debug)]
#[command(name = "docbench-benchmark")]
struct Args {
    /// Label for this run (used in output).
    #[arg(long, default_value = "run")]
    label: String,

    /// JSON configuration file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    service: ServiceOverrides,

    /// Number of records to create.
    #[arg(long)]
    records: Option<usize>,

    /// Records handed to the dispatcher per create sub-batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum number of operations in flight.
    #[arg(long)]
    workers: Option<usize>,

    /// Number of records to write through bulk upserts (0 skips the phase).
    #[arg(long)]
    upserts: Option<usize>,

    /// Records per upsert call.
    #[arg(long)]
    upsert_batch_size: Option<usize>,

    /// Read back only a random sample of this many written records.
    #[arg(long)]
    verify_sample: Option<usize>,

    /// Seed for record generation and sampling.
    #[arg(long)]
    seed: Option<u64>,

    /// Assume the target is already provisioned.
    #[arg(long, default_value_t = false)]
    skip_provision: bool,

    /// Directory to write the per-phase CSV file.
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(String, Option<PathBuf>, BenchConfig)> {
        let mut config = BenchConfig::load_or_default(self.config.as_deref())
            .context("failed to load configuration")?;
        self.service.apply(&mut config.service);

        let workload = &mut config.workload;
        if let Some(records) = self.records {
            workload.record_count = records;
        }
        if let Some(batch_size) = self.batch_size {
            workload.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            workload.max_workers = workers;
        }
        if let Some(upserts) = self.upserts {
            workload.upsert_count = upserts;
        }
        if let Some(upsert_batch_size) = self.upsert_batch_size {
            workload.upsert_batch_size = upsert_batch_size;
        }
        if self.verify_sample.is_some() {
            workload.verify_sample = self.verify_sample;
        }
        if self.seed.is_some() {
            workload.seed = self.seed;
        }
        if self.skip_provision {
            workload.provision = false;
        }

        Ok((self.label, self.csv_dir, config))
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let (label, csv_dir, config) = args.into_config()?;
    config.validate().context("invalid configuration")?;

    let store = Arc::new(
        StoreAdapter::from_config(&config.service).context("failed to initialise store client")?,
    );

    println!("=== {label} ===");
    println!(
        "  records={} batch_size={} workers={} upserts={} backend={:?}",
        config.workload.record_count,
        config.workload.batch_size,
        config.workload.max_workers,
        config.workload.upsert_count,
        config.service.backend
    );

    let report = run_pipeline(store.clone(), store.as_ref(), &config).await?;
    print_report(&report);

    if let Some(dir) = csv_dir {
        write_phase_csv(&dir, &label, &report)?;
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    if let Some(provisioned) = &report.provisioned {
        for resource in &provisioned.created {
            println!("  provisioned {resource}");
        }
    }
    print_counts("writes", &report.writes);
    if report.upserts.attempted > 0 {
        print_counts("upserts", &report.upserts);
    }
    println!(
        "  verified {}/{} read-backs",
        report.verified.succeeded, report.verified.attempted
    );
    println!();

    for phase in &report.phases {
        println!("{phase}");
    }
    println!();
}

fn print_counts(name: &str, counts: &PhaseCounts) {
    println!(
        "  {name:<8} attempted={} succeeded={} failed={}",
        counts.attempted, counts.succeeded, counts.failed
    );
}

fn write_phase_csv(dir: &Path, name: &str, report: &RunReport) -> Result<()> {
    create_dir_all(dir)?;
    let path = dir.join(format!("{name}.csv"));
    let mut file = File::create(&path)?;
    writeln!(file, "{}", OutputRow::csv_header())?;

    for phase in &report.phases {
        writeln!(file, "{}", OutputRow::from_report(name, phase).to_csv())?;
    }

    println!("    wrote {}", path.display());
    Ok(())
}
