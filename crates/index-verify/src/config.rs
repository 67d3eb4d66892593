//! Verification tunables.
//!
//! Every key has a default, so a config file only needs the values it
//! changes. Command-line flags are applied on top by `VerifyArgs`.

use std::path::Path;

use search_client::ServiceVersion;
use serde::Deserialize;

use crate::document::ContentSelector;
use crate::error::VerifyError;

/// Largest `from + size` a search request may page to on the default
/// `index.max_result_window`.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// How documents are drawn from the source index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Randomly ranked pages until a percentage of the destination is checked.
    #[default]
    Random,
    /// Scroll over the whole source index.
    Scan,
}

/// Tunables for one verification run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    pub mode: SamplingMode,
    /// Documents per multi-get during a scan.
    pub scan_batch_size: usize,
    /// Documents per random page.
    pub random_batch_size: usize,
    /// Pages drawn from one random seed before reseeding.
    pub random_checks_before_reset: usize,
    /// A sampling ratio must strictly exceed this to pass.
    pub match_threshold: f64,
    /// Fraction of the destination document count to check in random mode.
    pub check_percentage: f64,
    /// Stop a scan once this many documents were dispatched.
    pub max_scan: Option<u64>,
    /// Multi-get requests allowed in flight at once.
    pub max_in_flight: usize,
    /// Compare content, not just presence.
    pub check_content: bool,
    /// `_source` field holding the compared content.
    pub content_field: String,
    /// Compare the whole `_source` instead of `content_field`.
    pub compare_whole_source: bool,
    /// Seeds the generator of random-ranking seeds, for reproducible runs.
    pub random_seed: Option<u64>,
    pub request_timeout_secs: u64,
    pub scroll_keep_alive: String,
    /// Skip version detection for the source deployment.
    pub source_version: Option<ServiceVersion>,
    /// Skip version detection for the destination deployment.
    pub destination_version: Option<ServiceVersion>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Random,
            scan_batch_size: 50,
            random_batch_size: 10,
            random_checks_before_reset: 100,
            match_threshold: 0.9,
            check_percentage: 0.1,
            max_scan: None,
            max_in_flight: 1,
            check_content: true,
            content_field: "body".to_string(),
            compare_whole_source: false,
            random_seed: None,
            request_timeout_secs: 60,
            scroll_keep_alive: "5m".to_string(),
            source_version: None,
            destination_version: None,
        }
    }
}

impl VerifyConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, VerifyError> {
        toml::from_str(content).map_err(|source| VerifyError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, VerifyError> {
        let content = std::fs::read_to_string(path).map_err(|source| VerifyError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    pub fn content_selector(&self) -> ContentSelector {
        if self.compare_whole_source {
            ContentSelector::WholeSource
        } else {
            ContentSelector::Field(self.content_field.clone())
        }
    }

    /// Reject values that would make a run meaningless or never terminate.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(VerifyError::Config(format!(
                "match_threshold must be within [0, 1], got {}",
                self.match_threshold
            )));
        }
        if !(self.check_percentage > 0.0 && self.check_percentage.is_finite()) {
            return Err(VerifyError::Config(format!(
                "check_percentage must be positive, got {}",
                self.check_percentage
            )));
        }
        for (name, value) in [
            ("scan_batch_size", self.scan_batch_size),
            ("random_batch_size", self.random_batch_size),
            ("random_checks_before_reset", self.random_checks_before_reset),
            ("max_in_flight", self.max_in_flight),
        ] {
            if value == 0 {
                return Err(VerifyError::Config(format!("{name} must be at least 1")));
            }
        }
        let window = self
            .random_checks_before_reset
            .saturating_mul(self.random_batch_size);
        if window > MAX_RESULT_WINDOW {
            return Err(VerifyError::Config(format!(
                "random_checks_before_reset * random_batch_size must not exceed the \
                 {MAX_RESULT_WINDOW} document result window, got {window}"
            )));
        }
        if !self.compare_whole_source && self.content_field.is_empty() {
            return Err(VerifyError::Config(
                "content_field must not be empty unless compare_whole_source is set".to_string(),
            ));
        }
        Ok(())
    }
}
