//! Verification run over one source/destination index pair.

use std::time::Instant;

use search_client::SearchClient;
use tracing::info;

use crate::config::{SamplingMode, VerifyConfig};
use crate::error::{PreconditionError, VerifyError};
use crate::matcher::BatchMatcher;
use crate::random::{RandomSampler, RandomSettings};
use crate::report::{CheckCategory, MatchTally, Verdict, VerificationSummary};
use crate::reporter::{ReportEvent, Reporter};
use crate::scan::{ScanSampler, ScanSettings};
use crate::schema::compare_mappings;
use crate::stats::compare_stats;

/// Runs the stats, mapping and sampling checks in order.
///
/// FAILURE verdicts are collected and do not stop the run; transport and
/// precondition errors abort it.
pub struct IndexVerifier<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    source_index: &'a str,
    destination: &'a D,
    destination_index: &'a str,
    config: VerifyConfig,
    reporter: &'a dyn Reporter,
}

impl<'a, S, D> IndexVerifier<'a, S, D>
where
    S: SearchClient + ?Sized,
    D: SearchClient + ?Sized,
{
    /// Create a verifier. The config is validated here.
    pub fn new(
        source: &'a S,
        source_index: &'a str,
        destination: &'a D,
        destination_index: &'a str,
        config: VerifyConfig,
        reporter: &'a dyn Reporter,
    ) -> Result<Self, VerifyError> {
        config.validate()?;
        Ok(Self {
            source,
            source_index,
            destination,
            destination_index,
            config,
            reporter,
        })
    }

    /// Run every check and collect the verdicts.
    pub async fn verify(&self) -> Result<VerificationSummary, VerifyError> {
        let start_time = Instant::now();
        let mut summary = VerificationSummary::default();

        info!(
            "Verifying {} against {} ({:?} sampling)",
            self.destination_index, self.source_index, self.config.mode
        );

        let stats = compare_stats(
            self.source,
            self.source_index,
            self.destination,
            self.destination_index,
            self.reporter,
        )
        .await?;
        summary.push(stats.document_count.clone());
        summary.push(stats.store_size.clone());

        let mapping = compare_mappings(
            self.source,
            self.source_index,
            self.destination,
            self.destination_index,
            self.reporter,
        )
        .await?;
        summary.push(mapping);

        if stats.destination.document_count == 0 {
            return Err(PreconditionError::EmptyDestination.into());
        }

        let (category, tally) = match self.config.mode {
            SamplingMode::Scan => (CheckCategory::Scan, self.scan().await?),
            SamplingMode::Random => (
                CheckCategory::Random,
                self.sample_random(stats.destination.document_count).await?,
            ),
        };
        let verdict = Verdict::from_tally(category, &tally, self.config.match_threshold)?;
        self.reporter.report(ReportEvent::Verdict(verdict.clone()));
        summary.push(verdict);

        info!(
            "Verification finished in {:?} with {} failing checks",
            start_time.elapsed(),
            summary.failures()
        );
        Ok(summary)
    }

    fn matcher(&self) -> BatchMatcher<'a, D> {
        BatchMatcher::new(
            self.destination,
            self.destination_index,
            self.config.content_selector(),
            self.reporter,
        )
    }

    /// Full scan of the source index.
    pub async fn scan(&self) -> Result<MatchTally, VerifyError> {
        let matcher = self.matcher();
        let settings = ScanSettings {
            batch_size: self.config.scan_batch_size,
            max_scan: self.config.max_scan,
            max_in_flight: self.config.max_in_flight,
            check_content: self.config.check_content,
            selector: self.config.content_selector(),
        };
        ScanSampler::new(
            self.source,
            self.source_index,
            &matcher,
            settings,
            self.reporter,
        )
        .run()
        .await
    }

    /// Random sampling of the source index until `check_percentage` of
    /// `destination_count` documents were checked.
    pub async fn sample_random(&self, destination_count: u64) -> Result<MatchTally, VerifyError> {
        let matcher = self.matcher();
        let settings = RandomSettings {
            batch_size: self.config.random_batch_size,
            pages_per_seed: self.config.random_checks_before_reset,
            check_percentage: self.config.check_percentage,
            max_in_flight: self.config.max_in_flight,
            check_content: self.config.check_content,
            selector: self.config.content_selector(),
            base_seed: self.config.random_seed,
        };
        RandomSampler::new(
            self.source,
            self.source_index,
            &matcher,
            settings,
            self.reporter,
        )
        .run(destination_count)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered_documents, ClientCall, InMemorySearchClient, RecordingReporter};
    use serde_json::json;

    fn mapping() -> serde_json::Value {
        json!({ "doc": { "properties": { "body": { "type": "string" } } } })
    }

    fn pair(destination_docs: std::ops::Range<u32>) -> (InMemorySearchClient, InMemorySearchClient) {
        let source = InMemorySearchClient::new()
            .with_documents("old", numbered_documents(0..1000))
            .with_mapping("old", mapping())
            .with_store_size("old", 4096);
        let destination = InMemorySearchClient::new()
            .with_documents("new", numbered_documents(destination_docs))
            .with_mapping("new", mapping())
            .with_store_size("new", 4096);
        (source, destination)
    }

    #[tokio::test]
    async fn test_scan_of_identical_indices() {
        let (source, destination) = pair(0..1000);
        let reporter = RecordingReporter::default();
        let config = VerifyConfig {
            mode: SamplingMode::Scan,
            ..Default::default()
        };
        let verifier =
            IndexVerifier::new(&source, "old", &destination, "new", config, &reporter).unwrap();

        let summary = verifier.verify().await.unwrap();
        assert!(summary.is_success());
        assert_eq!(
            reporter.verdict_lines(),
            vec![
                "OK: Document count (1000 = 1000)",
                "OK: Index size (4096 = 4096)",
                "OK: Index mappings match",
                "OK: scanned documents matching (1000 out of 1000, 100%)",
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_with_missing_documents_continues_after_count_failure() {
        let (source, destination) = pair(0..850);
        let reporter = RecordingReporter::default();
        let config = VerifyConfig {
            mode: SamplingMode::Scan,
            ..Default::default()
        };
        let verifier =
            IndexVerifier::new(&source, "old", &destination, "new", config, &reporter).unwrap();

        let summary = verifier.verify().await.unwrap();
        assert_eq!(summary.failures(), 2);
        assert_eq!(summary.exit_code(), 2);
        let lines = reporter.verdict_lines();
        assert_eq!(lines[0], "FAILURE: Document count (1000 != 850)");
        assert_eq!(
            lines[3],
            "FAILURE: scanned documents matching (850 out of 1000, 85%)"
        );
        assert_eq!(reporter.missing_ids().len(), 150);
    }

    #[tokio::test]
    async fn test_random_sampling_checks_percentage() {
        let (source, destination) = pair(0..1000);
        let reporter = RecordingReporter::default();
        let config = VerifyConfig {
            random_seed: Some(11),
            ..Default::default()
        };
        let verifier =
            IndexVerifier::new(&source, "old", &destination, "new", config, &reporter).unwrap();

        let summary = verifier.verify().await.unwrap();
        assert!(summary.is_success());
        let last = summary.verdicts.last().unwrap().to_string();
        assert_eq!(last, "OK: random documents matching (100 out of 100, 100%)");
    }

    #[tokio::test]
    async fn test_empty_destination_aborts_random_sampling() {
        let source = InMemorySearchClient::new().with_documents("old", numbered_documents(0..10));
        let destination = InMemorySearchClient::new().with_documents("new", Vec::new());
        let reporter = RecordingReporter::default();
        let verifier = IndexVerifier::new(
            &source,
            "old",
            &destination,
            "new",
            VerifyConfig::default(),
            &reporter,
        )
        .unwrap();

        let err = verifier.verify().await.unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Precondition(PreconditionError::EmptyDestination)
        ));
        // Stats and mapping verdicts were still reported.
        assert_eq!(reporter.verdicts().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_destination_aborts_scan() {
        let source = InMemorySearchClient::new().with_documents("old", numbered_documents(0..100));
        let destination = InMemorySearchClient::new().with_documents("new", Vec::new());
        let reporter = RecordingReporter::default();
        let config = VerifyConfig {
            mode: SamplingMode::Scan,
            ..Default::default()
        };
        let verifier =
            IndexVerifier::new(&source, "old", &destination, "new", config, &reporter).unwrap();

        let err = verifier.verify().await.unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Precondition(PreconditionError::EmptyDestination)
        ));
        // No scan verdict, and the source was never scrolled.
        assert_eq!(reporter.verdicts().len(), 3);
        assert!(!source
            .calls()
            .iter()
            .any(|c| matches!(c, ClientCall::OpenScroll { .. })));
    }

    #[tokio::test]
    async fn test_empty_source_scan_is_precondition_error() {
        let source = InMemorySearchClient::new().with_documents("old", Vec::new());
        let destination = InMemorySearchClient::new().with_documents("new", numbered_documents(0..10));
        let reporter = RecordingReporter::default();
        let config = VerifyConfig {
            mode: SamplingMode::Scan,
            ..Default::default()
        };
        let verifier =
            IndexVerifier::new(&source, "old", &destination, "new", config, &reporter).unwrap();

        let err = verifier.verify().await.unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Precondition(PreconditionError::EmptyTally(CheckCategory::Scan))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let client = InMemorySearchClient::new();
        let reporter = RecordingReporter::default();
        let config = VerifyConfig {
            scan_batch_size: 0,
            ..Default::default()
        };
        let result = IndexVerifier::new(&client, "old", &client, "new", config, &reporter);
        assert!(matches!(result, Err(VerifyError::Config(_))));
    }
}
