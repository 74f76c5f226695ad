use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docbench::provision::{SchemaSpec, ensure_schema};
use docbench::workload::VERIFY_FIELD;
use docbench::{
    BenchConfig, DocumentId, DocumentStore, FileFilter, ServiceOverrides, StoreAdapter, Target,
    verify,
};

#[derive(Parser, Debug)]
#[command(name = "docbench", about = "Inspect and provision the benchmark target")]
struct Cli {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    service: ServiceOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database, collection and record attributes if missing.
    Provision,

    /// List files in a bucket.
    Files {
        /// Bucket to list; falls back to `target.bucket_id` from the config.
        #[arg(long)]
        bucket: Option<String>,

        /// Only list files with this MIME type.
        #[arg(long)]
        mime_type: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Print one page of documents from the target collection.
    Documents {
        #[arg(long, default_value_t = 25)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Fetch a single document by id.
    Get {
        id: DocumentId,

        /// Check that the email field equals this value instead of printing.
        #[arg(long)]
        expect_email: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let mut config = BenchConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    cli.service.apply(&mut config.service);
    config.validate().context("invalid configuration")?;

    let store =
        StoreAdapter::from_config(&config.service).context("failed to initialise store client")?;
    let target = Target::from(&config.target);
    info!(
        backend = ?config.service.backend,
        database = %target.database_id,
        collection = %target.collection_id,
        "store ready"
    );

    match cli.command {
        Command::Provision => {
            let spec = SchemaSpec::for_records(&config.target);
            let report = ensure_schema(&store, &spec).await?;
            if report.is_noop() {
                println!("target already provisioned");
            }
            for resource in &report.created {
                println!("created {resource}");
            }
        }
        Command::Files {
            bucket,
            mime_type,
            limit,
        } => {
            let Some(bucket) = bucket.or(config.target.bucket_id) else {
                bail!("no bucket given; pass --bucket or set target.bucket_id");
            };
            let filter = FileFilter { mime_type, limit };
            let files = store
                .list_files(&bucket, &filter)
                .await
                .with_context(|| format!("failed to list files in bucket {bucket}"))?;
            for file in &files {
                println!(
                    "{:<34} {:<24} {:>10} B  {}",
                    file.id, file.mime_type, file.size_bytes, file.name
                );
            }
            println!("{} file(s)", files.len());
        }
        Command::Documents { limit, offset } => {
            let page = store
                .list_documents(&target, limit, offset)
                .await
                .context("failed to list documents")?;
            for document in &page.documents {
                println!("{} {}", document.id, serde_json::to_string(&document.fields)?);
            }
            println!(
                "showing {} of {} (offset {offset})",
                page.documents.len(),
                page.total
            );
        }
        Command::Get { id, expect_email } => match expect_email {
            Some(expected) => {
                if !verify::verify(&store, &target, &id, VERIFY_FIELD, &expected).await {
                    bail!("document {id} did not verify");
                }
                println!("document {id} verified");
            }
            None => {
                let document = store
                    .get_document(&target, &id)
                    .await
                    .with_context(|| format!("failed to fetch document {id}"))?;
                println!("{}", serde_json::to_string_pretty(&document.to_wire())?);
            }
        },
    }

    Ok(())
}

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
