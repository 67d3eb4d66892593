//! Batch matching against the destination index.

use search_client::SearchClient;

use crate::document::{Batch, ContentSelector};
use crate::error::VerifyError;
use crate::report::MatchTally;
use crate::reporter::{ReportEvent, Reporter};

/// Checks batches of source documents against the destination with one
/// multi-get per batch.
pub struct BatchMatcher<'a, D: ?Sized> {
    destination: &'a D,
    index: &'a str,
    selector: ContentSelector,
    reporter: &'a dyn Reporter,
}

impl<'a, D> BatchMatcher<'a, D>
where
    D: SearchClient + ?Sized,
{
    pub fn new(
        destination: &'a D,
        index: &'a str,
        selector: ContentSelector,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            destination,
            index,
            selector,
            reporter,
        }
    }

    /// Look up every document of the batch and tally the matches.
    ///
    /// The tally's total is the batch size. Absent documents and content
    /// mismatches are reported individually and counted as non-matching.
    pub async fn check(&self, batch: Batch) -> Result<MatchTally, VerifyError> {
        if batch.is_empty() {
            return Ok(MatchTally::default());
        }

        let ids = batch.ids();
        let entries = self.destination.multi_get(self.index, &ids).await?;

        let mut matching = 0u64;
        for entry in entries {
            let Some(stored) = entry.source else {
                self.reporter.report(ReportEvent::MissingDocument {
                    expected: batch.expected(&entry.id).cloned(),
                    id: entry.id,
                });
                continue;
            };

            if !batch.checks_content() {
                matching += 1;
                continue;
            }

            let Some(expected) = batch.expected(&entry.id) else {
                tracing::warn!(
                    "Destination returned document {} that was not requested",
                    entry.id
                );
                continue;
            };

            let actual = self.selector.extract(&stored);
            if *expected == actual {
                matching += 1;
            } else {
                self.reporter.report(ReportEvent::ContentMismatch {
                    id: entry.id,
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        tracing::debug!(
            "Batch of {} documents: {} matching in {}",
            batch.len(),
            matching,
            self.index
        );

        Ok(MatchTally::new(matching, batch.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentRef, DocumentSnapshot};
    use crate::testing::{InMemorySearchClient, RecordingReporter};
    use serde_json::json;

    fn snapshots(range: std::ops::Range<u32>) -> Vec<DocumentSnapshot> {
        range
            .map(|i| DocumentSnapshot {
                id: format!("doc-{i}"),
                body: json!(format!("body {i}")),
            })
            .collect()
    }

    fn destination(range: std::ops::Range<u32>) -> InMemorySearchClient {
        InMemorySearchClient::new().with_documents(
            "dest",
            range.map(|i| (format!("doc-{i}"), json!({ "body": format!("body {i}") }))),
        )
    }

    #[tokio::test]
    async fn test_all_present_and_identical() {
        let client = destination(0..50);
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&client, "dest", ContentSelector::default(), &reporter);

        let tally = matcher.check(Batch::with_content(snapshots(0..50))).await.unwrap();
        assert_eq!(tally, MatchTally::new(50, 50));
        assert!(reporter.events().is_empty());
        assert_eq!(client.multi_get_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_documents_are_counted_and_reported() {
        // doc-40..doc-49 never made it across.
        let client = destination(0..40);
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&client, "dest", ContentSelector::default(), &reporter);

        let tally = matcher.check(Batch::with_content(snapshots(0..50))).await.unwrap();
        assert_eq!(tally, MatchTally::new(40, 50));

        let missing = reporter.missing_ids();
        assert_eq!(missing.len(), 10);
        assert!(missing.contains(&"doc-45".to_string()));
        assert!(reporter.mismatched_ids().is_empty());
    }

    #[tokio::test]
    async fn test_content_mismatch_is_reported_with_both_bodies() {
        let client = destination(0..10).with_document("dest", "doc-3", json!({ "body": "changed" }));
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&client, "dest", ContentSelector::default(), &reporter);

        let tally = matcher.check(Batch::with_content(snapshots(0..10))).await.unwrap();
        assert_eq!(tally, MatchTally::new(9, 10));
        assert_eq!(
            reporter.events(),
            vec![ReportEvent::ContentMismatch {
                id: "doc-3".to_string(),
                expected: json!("body 3"),
                actual: json!("changed"),
            }]
        );
    }

    #[tokio::test]
    async fn test_presence_only_ignores_content() {
        let client = destination(0..10).with_document("dest", "doc-3", json!({ "body": "changed" }));
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&client, "dest", ContentSelector::default(), &reporter);

        let refs = (0..12)
            .map(|i| DocumentRef {
                id: format!("doc-{i}"),
            })
            .collect();
        let tally = matcher.check(Batch::refs_only(refs)).await.unwrap();
        assert_eq!(tally, MatchTally::new(10, 12));
        assert_eq!(reporter.missing_ids(), vec!["doc-10", "doc-11"]);
    }

    #[tokio::test]
    async fn test_empty_batch_issues_no_request() {
        let client = destination(0..1);
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&client, "dest", ContentSelector::default(), &reporter);

        let tally = matcher.check(Batch::default()).await.unwrap();
        assert_eq!(tally, MatchTally::default());
        assert_eq!(client.multi_get_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_destination_index_is_transport_error() {
        let client = InMemorySearchClient::new();
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&client, "dest", ContentSelector::default(), &reporter);

        let err = matcher
            .check(Batch::with_content(snapshots(0..1)))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Transport(_)));
    }
}
