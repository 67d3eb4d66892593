//! es-verify Library
//!
//! Verifies that an Elasticsearch index copied to another deployment kept
//! its content: document count and store size, field mappings, and the
//! documents themselves, either by a full scan or by random sampling.
//!
//! # CLI Usage
//!
//! ```bash
//! # Random sampling of 10% of the destination (default)
//! es-verify --old http://old:9200 articles --new http://new:9200 articles
//!
//! # Full scan, stopping after 100000 documents
//! es-verify -o http://old:9200 articles -n http://new:9200 articles --scan --max-scan 100000
//!
//! # Tunables from a file, version detection skipped for the old cluster
//! es-verify -o http://old:9200 articles -n http://new:9200 articles \
//!   --config verify.toml --old-version 0.90
//! ```
//!
//! The exit status is the number of failed checks (at most 100), or 1 when
//! the run aborts on an error.

use std::time::Duration;

use anyhow::Context;
use elasticsearch_client::{ClientOptions, ElasticsearchClient};
use index_verify::{IndexEndpoint, IndexVerifier, Reporter, VerificationSummary, VerifyConfig};
use search_client::ServiceVersion;

pub use index_verify::{ConsoleReporter, VerifyArgs};

/// Use the configured version, or detect it from the host. Detection
/// failure falls back to the latest profile.
pub async fn resolve_version(
    host: &str,
    configured: Option<ServiceVersion>,
    timeout: Duration,
) -> ServiceVersion {
    if let Some(version) = configured {
        tracing::debug!("Using configured version {} for {}", version, host);
        return version;
    }
    match search_version::detect_server_version(host, timeout).await {
        Ok(version) => {
            tracing::info!("Detected version {} at {}", version, host);
            version
        }
        Err(e) => {
            let fallback = ServiceVersion::latest();
            tracing::warn!(
                "Version detection failed for {}: {:#}. Assuming {}",
                host,
                e,
                fallback
            );
            fallback
        }
    }
}

/// Build a client for one endpoint.
pub async fn connect(
    endpoint: &IndexEndpoint,
    configured: Option<ServiceVersion>,
    config: &VerifyConfig,
) -> anyhow::Result<ElasticsearchClient> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let version = resolve_version(&endpoint.host, configured, timeout).await;
    let options = ClientOptions {
        timeout,
        scroll_keep_alive: config.scroll_keep_alive.clone(),
    };
    ElasticsearchClient::new(&endpoint.host, version, options)
        .with_context(|| format!("Failed to create client for {}", endpoint.host))
}

/// Run a verification described by command-line arguments.
pub async fn run_verification(
    args: &VerifyArgs,
    reporter: &dyn Reporter,
) -> anyhow::Result<VerificationSummary> {
    let config = args
        .resolve_config()
        .context("Failed to resolve verification config")?;
    let old = args.old_endpoint()?;
    let new = args.new_endpoint()?;

    let source = connect(&old, config.source_version, &config).await?;
    let destination = connect(&new, config.destination_version, &config).await?;

    let verifier = IndexVerifier::new(
        &source,
        &old.index,
        &destination,
        &new.index,
        config,
        reporter,
    )?;
    verifier.verify().await.with_context(|| {
        format!(
            "Verification of {}/{} against {}/{} aborted",
            new.host, new.index, old.host, old.index
        )
    })
}
