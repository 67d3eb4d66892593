//! CLI argument definitions for the index verifier.

use clap::Args;
use search_client::ServiceVersion;
use std::path::PathBuf;

use crate::config::{SamplingMode, VerifyConfig};
use crate::error::VerifyError;

/// A search service host and an index on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEndpoint {
    pub host: String,
    pub index: String,
}

/// Arguments for verifying a copied index.
#[derive(Args, Clone, Debug)]
pub struct VerifyArgs {
    /// Source host and index, e.g. `--old http://old:9200 articles`
    #[arg(long, short = 'o', num_args = 2, value_names = ["HOST", "INDEX"], required = true)]
    pub old: Vec<String>,

    /// Destination host and index
    #[arg(long, short = 'n', num_args = 2, value_names = ["HOST", "INDEX"], required = true)]
    pub new: Vec<String>,

    /// Scan the whole source index instead of sampling it randomly
    #[arg(long, short = 's', conflicts_with = "mode")]
    pub scan: bool,

    /// Sampling mode
    #[arg(long, value_enum, env = "ES_VERIFY_MODE")]
    pub mode: Option<SamplingMode>,

    /// TOML file with verification tunables; flags override its values
    #[arg(long, env = "ES_VERIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fraction of the destination document count to check in random mode
    #[arg(long, short = 'c', env = "ES_VERIFY_CHECK_PERCENTAGE")]
    pub check_percentage: Option<f64>,

    /// Match ratio a sampling check must exceed to pass
    #[arg(long, short = 't', env = "ES_VERIFY_MATCH_THRESHOLD")]
    pub match_threshold: Option<f64>,

    /// Stop a scan after this many documents
    #[arg(long, env = "ES_VERIFY_MAX_SCAN")]
    pub max_scan: Option<u64>,

    /// Documents per multi-get during a scan
    #[arg(long)]
    pub scan_batch_size: Option<usize>,

    /// Documents per random page
    #[arg(long)]
    pub random_batch_size: Option<usize>,

    /// Random pages drawn from one seed before reseeding
    #[arg(long)]
    pub random_checks_before_reset: Option<usize>,

    /// Multi-get requests allowed in flight at once
    #[arg(long, env = "ES_VERIFY_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// Only check that documents exist in the destination
    #[arg(long)]
    pub no_content_check: bool,

    /// `_source` field compared between indices
    #[arg(long, conflicts_with = "compare_source")]
    pub content_field: Option<String>,

    /// Compare the whole `_source` of each document
    #[arg(long)]
    pub compare_source: bool,

    /// Seed for the random sampler, for reproducible runs
    #[arg(long, env = "ES_VERIFY_RANDOM_SEED")]
    pub random_seed: Option<u64>,

    /// Source service version (0.90, 1.x, 5.x, 7.x); detected when omitted
    #[arg(long)]
    pub old_version: Option<ServiceVersion>,

    /// Destination service version; detected when omitted
    #[arg(long)]
    pub new_version: Option<ServiceVersion>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "ES_VERIFY_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Keep-alive of scroll contexts, e.g. `5m`
    #[arg(long)]
    pub scroll_keep_alive: Option<String>,
}

fn endpoint(values: &[String], flag: &str) -> Result<IndexEndpoint, VerifyError> {
    match values {
        [host, index] => Ok(IndexEndpoint {
            host: host.trim_end_matches('/').to_string(),
            index: index.clone(),
        }),
        _ => Err(VerifyError::Config(format!(
            "--{flag} takes a host and an index name"
        ))),
    }
}

impl VerifyArgs {
    pub fn old_endpoint(&self) -> Result<IndexEndpoint, VerifyError> {
        endpoint(&self.old, "old")
    }

    pub fn new_endpoint(&self) -> Result<IndexEndpoint, VerifyError> {
        endpoint(&self.new, "new")
    }

    /// Config file values (or defaults) with command-line overrides applied,
    /// validated.
    pub fn resolve_config(&self) -> Result<VerifyConfig, VerifyError> {
        let mut config = match &self.config {
            Some(path) => VerifyConfig::from_file(path)?,
            None => VerifyConfig::default(),
        };

        if self.scan {
            config.mode = SamplingMode::Scan;
        } else if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(v) = self.check_percentage {
            config.check_percentage = v;
        }
        if let Some(v) = self.match_threshold {
            config.match_threshold = v;
        }
        if self.max_scan.is_some() {
            config.max_scan = self.max_scan;
        }
        if let Some(v) = self.scan_batch_size {
            config.scan_batch_size = v;
        }
        if let Some(v) = self.random_batch_size {
            config.random_batch_size = v;
        }
        if let Some(v) = self.random_checks_before_reset {
            config.random_checks_before_reset = v;
        }
        if let Some(v) = self.max_in_flight {
            config.max_in_flight = v;
        }
        if self.no_content_check {
            config.check_content = false;
        }
        if let Some(field) = &self.content_field {
            config.content_field = field.clone();
            config.compare_whole_source = false;
        }
        if self.compare_source {
            config.compare_whole_source = true;
        }
        if self.random_seed.is_some() {
            config.random_seed = self.random_seed;
        }
        if self.old_version.is_some() {
            config.source_version = self.old_version;
        }
        if self.new_version.is_some() {
            config.destination_version = self.new_version;
        }
        if let Some(v) = self.request_timeout_secs {
            config.request_timeout_secs = v;
        }
        if let Some(v) = &self.scroll_keep_alive {
            config.scroll_keep_alive = v.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: VerifyArgs,
    }

    fn parse(extra: &[&str]) -> VerifyArgs {
        let mut argv = vec![
            "es-verify",
            "--old",
            "http://old:9200/",
            "articles",
            "--new",
            "http://new:9200",
            "articles_v2",
        ];
        argv.extend_from_slice(extra);
        TestCli::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_endpoints() {
        let args = parse(&[]);
        assert_eq!(
            args.old_endpoint().unwrap(),
            IndexEndpoint {
                host: "http://old:9200".to_string(),
                index: "articles".to_string(),
            }
        );
        assert_eq!(args.new_endpoint().unwrap().index, "articles_v2");
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = parse(&[]).resolve_config().unwrap();
        assert_eq!(config, VerifyConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "-s",
            "--max-scan",
            "5000",
            "-t",
            "0.95",
            "--no-content-check",
            "--old-version",
            "0.90",
            "--random-seed",
            "3",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.mode, SamplingMode::Scan);
        assert_eq!(config.max_scan, Some(5000));
        assert_eq!(config.match_threshold, 0.95);
        assert!(!config.check_content);
        assert_eq!(config.source_version, Some(ServiceVersion::V0_90));
        assert_eq!(config.destination_version, None);
        assert_eq!(config.random_seed, Some(3));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mode = \"scan\"\ncheck_percentage = 0.5\nscan_batch_size = 20"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["--config", &path, "-c", "0.25", "--mode", "random"])
            .resolve_config()
            .unwrap();
        assert_eq!(config.mode, SamplingMode::Random);
        assert_eq!(config.check_percentage, 0.25);
        assert_eq!(config.scan_batch_size, 20);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let err = parse(&["--max-in-flight", "0"]).resolve_config().unwrap_err();
        assert!(matches!(err, VerifyError::Config(_)));
    }

    #[test]
    fn test_missing_index_is_rejected_by_parser() {
        let result = TestCli::try_parse_from(["es-verify", "--old", "http://old:9200"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_version_is_rejected_by_parser() {
        let result = TestCli::try_parse_from([
            "es-verify",
            "--old",
            "h",
            "i",
            "--new",
            "h",
            "j",
            "--new-version",
            "latest",
        ]);
        assert!(result.is_err());
    }
}
