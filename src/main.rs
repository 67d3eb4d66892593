//! Command-line interface for es-verify
//!
//! # Usage Examples
//!
//! ```bash
//! # Sample 20% of the destination, require more than 95% matching
//! es-verify --old http://old:9200 articles --new http://new:9200 articles_v2 \
//!   --check-percentage 0.2 --match-threshold 0.95
//!
//! # Scan every document, four multi-gets in flight
//! es-verify -o http://old:9200 articles -n http://new:9200 articles_v2 \
//!   --scan --max-in-flight 4
//!
//! # Presence only, with debug logging
//! RUST_LOG=debug es-verify -o http://old:9200 articles -n http://new:9200 articles_v2 \
//!   --no-content-check
//! ```

use clap::Parser;
use es_verify::{run_verification, ConsoleReporter, VerifyArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "es-verify")]
#[command(about = "Verify that a copied Elasticsearch index matches its source")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    verify: VerifyArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match run().await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    // Logs go to stderr; stdout carries the verdict lines
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let summary = run_verification(&cli.verify, &ConsoleReporter).await?;
    if !summary.is_success() {
        tracing::warn!("{} checks failed", summary.failures());
    }
    Ok(summary.exit_code())
}
