//! Full-scan sampling of the source index.
//!
//! `DocumentScanner` turns the service's scroll pages, whose size the service
//! decides, into batches of exactly `batch_size` documents (the last one may
//! be shorter). Only one scroll page plus one partial batch is ever buffered.

use std::collections::VecDeque;

use futures::stream::{FuturesOrdered, StreamExt};
use search_client::{SearchClient, SourceDocument};

use crate::document::{Batch, ContentSelector};
use crate::error::VerifyError;
use crate::matcher::BatchMatcher;
use crate::report::{CheckCategory, MatchTally, ProgressTracker};
use crate::reporter::{ReportEvent, Reporter};

/// Lazy cursor over every document of an index.
pub struct DocumentScanner<'a, S: ?Sized> {
    client: &'a S,
    index: &'a str,
    page_size: usize,
    scroll_id: Option<String>,
    buffer: VecDeque<SourceDocument>,
    opened: bool,
    exhausted: bool,
}

impl<'a, S> DocumentScanner<'a, S>
where
    S: SearchClient + ?Sized,
{
    pub fn new(client: &'a S, index: &'a str, page_size: usize) -> Self {
        Self {
            client,
            index,
            page_size,
            scroll_id: None,
            buffer: VecDeque::new(),
            opened: false,
            exhausted: false,
        }
    }

    async fn fetch_page(&mut self) -> Result<(), VerifyError> {
        let page = if !self.opened {
            self.opened = true;
            self.client.open_scroll(self.index, self.page_size).await?
        } else {
            match &self.scroll_id {
                Some(scroll_id) => self.client.next_scroll(scroll_id).await?,
                None => {
                    self.exhausted = true;
                    return Ok(());
                }
            }
        };

        if page.scroll_id.is_some() {
            self.scroll_id = page.scroll_id;
        }
        if page.documents.is_empty() {
            self.exhausted = true;
        }
        self.buffer.extend(page.documents);
        Ok(())
    }

    /// Next batch of up to `batch_size` documents, `None` once the index is
    /// exhausted.
    pub async fn next_batch(
        &mut self,
        batch_size: usize,
    ) -> Result<Option<Vec<SourceDocument>>, VerifyError> {
        while self.buffer.len() < batch_size && !self.exhausted {
            self.fetch_page().await?;
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let take = batch_size.min(self.buffer.len());
        Ok(Some(self.buffer.drain(..take).collect()))
    }

    /// Release the scroll context. Failure only loses a server-side context
    /// that expires on its own, so it is logged rather than returned.
    pub async fn close(self) {
        if let Some(scroll_id) = self.scroll_id {
            if let Err(e) = self.client.clear_scroll(&scroll_id).await {
                tracing::warn!("Failed to clear scroll on {}: {}", self.index, e);
            }
        }
    }
}

/// Settings of a full scan.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub batch_size: usize,
    /// Stop dispatching once this many documents were dispatched.
    pub max_scan: Option<u64>,
    pub max_in_flight: usize,
    pub check_content: bool,
    pub selector: ContentSelector,
}

/// Scans the source index and checks every batch against the destination.
pub struct ScanSampler<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    source_index: &'a str,
    matcher: &'a BatchMatcher<'a, D>,
    settings: ScanSettings,
    reporter: &'a dyn Reporter,
}

impl<'a, S, D> ScanSampler<'a, S, D>
where
    S: SearchClient + ?Sized,
    D: SearchClient + ?Sized,
{
    pub fn new(
        source: &'a S,
        source_index: &'a str,
        matcher: &'a BatchMatcher<'a, D>,
        settings: ScanSettings,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            source,
            source_index,
            matcher,
            settings,
            reporter,
        }
    }

    /// Run the scan and return its tally.
    ///
    /// At most `max_scan + batch_size - 1` documents are checked.
    pub async fn run(&self) -> Result<MatchTally, VerifyError> {
        let batch_size = self.settings.batch_size;
        let mut scanner = DocumentScanner::new(self.source, self.source_index, batch_size);
        let result = self.drive(&mut scanner).await;
        scanner.close().await;
        let tally = result?;

        tracing::info!(
            "Scan of {} finished: {} of {} documents matching",
            self.source_index,
            tally.matching,
            tally.total
        );
        Ok(tally)
    }

    async fn drive(&self, scanner: &mut DocumentScanner<'a, S>) -> Result<MatchTally, VerifyError> {
        let mut tally = MatchTally::default();
        let mut progress = ProgressTracker::default();
        let mut in_flight = FuturesOrdered::new();
        let mut dispatched = 0u64;
        let mut source_done = false;

        loop {
            while !source_done && in_flight.len() < self.settings.max_in_flight {
                if self.cap_reached(dispatched) {
                    tracing::info!(
                        "Reached scan cap of {} documents after {} dispatched",
                        self.settings.max_scan.unwrap_or_default(),
                        dispatched
                    );
                    source_done = true;
                    break;
                }
                match scanner.next_batch(self.settings.batch_size).await? {
                    Some(documents) => {
                        let batch = Batch::from_documents(
                            documents,
                            self.settings.check_content,
                            &self.settings.selector,
                        );
                        dispatched += batch.len() as u64;
                        in_flight.push_back(self.matcher.check(batch));
                    }
                    None => source_done = true,
                }
            }

            let Some(result) = in_flight.next().await else {
                break;
            };
            tally.absorb(result?);
            if let Some(processed) = progress.advance(tally.total) {
                self.reporter.report(ReportEvent::Progress {
                    category: CheckCategory::Scan,
                    processed,
                });
            }
        }

        Ok(tally)
    }

    fn cap_reached(&self, dispatched: u64) -> bool {
        self.settings
            .max_scan
            .is_some_and(|cap| dispatched >= cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered_documents, ClientCall, InMemorySearchClient, RecordingReporter};

    fn settings(batch_size: usize) -> ScanSettings {
        ScanSettings {
            batch_size,
            max_scan: None,
            max_in_flight: 1,
            check_content: true,
            selector: ContentSelector::default(),
        }
    }

    #[tokio::test]
    async fn test_scanner_rebatches_uneven_pages() {
        // The service hands out pages of 7 regardless of the requested size.
        let client = InMemorySearchClient::new()
            .with_documents("src", numbered_documents(0..23))
            .with_scroll_page_size(7);
        let mut scanner = DocumentScanner::new(&client, "src", 5);

        let mut sizes = Vec::new();
        while let Some(batch) = scanner.next_batch(5).await.unwrap() {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![5, 5, 5, 5, 3]);
        scanner.close().await;
        assert_eq!(client.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn test_scanner_empty_index() {
        let client = InMemorySearchClient::new().with_documents("src", Vec::new());
        let mut scanner = DocumentScanner::new(&client, "src", 50);
        assert!(scanner.next_batch(50).await.unwrap().is_none());
        // Exhausted cursors stay exhausted.
        assert!(scanner.next_batch(50).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_all_matching() {
        let docs = numbered_documents(0..120);
        let source = InMemorySearchClient::new().with_documents("src", docs.clone());
        let destination = InMemorySearchClient::new().with_documents("dst", docs);
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let sampler = ScanSampler::new(&source, "src", &matcher, settings(50), &reporter);
        let tally = sampler.run().await.unwrap();

        assert_eq!(tally, MatchTally::new(120, 120));
        assert_eq!(destination.multi_get_calls(), 3);
        assert_eq!(reporter.progress(), vec![100]);
        assert_eq!(source.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn test_scan_respects_cap() {
        let docs = numbered_documents(0..1000);
        let source = InMemorySearchClient::new().with_documents("src", docs.clone());
        let destination = InMemorySearchClient::new().with_documents("dst", docs);
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        for (cap, expected) in [(1u64, 50u64), (50, 50), (51, 100), (120, 150), (999, 1000)] {
            let settings = ScanSettings {
                max_scan: Some(cap),
                ..settings(50)
            };
            let sampler = ScanSampler::new(&source, "src", &matcher, settings, &reporter);
            let tally = sampler.run().await.unwrap();
            assert_eq!(tally.total, expected, "cap {cap}");
            assert!(tally.total <= cap + 50 - 1);
        }
    }

    #[tokio::test]
    async fn test_scan_with_concurrent_batches_keeps_exact_tally() {
        let docs = numbered_documents(0..500);
        let source = InMemorySearchClient::new().with_documents("src", docs.clone());
        let mut destination = InMemorySearchClient::new().with_documents("dst", docs);
        for i in (0..500).step_by(10) {
            destination = destination.without_document("dst", &format!("doc-{i:05}"));
        }
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let settings = ScanSettings {
            max_in_flight: 4,
            ..settings(20)
        };
        let sampler = ScanSampler::new(&source, "src", &matcher, settings, &reporter);
        let tally = sampler.run().await.unwrap();

        assert_eq!(tally, MatchTally::new(450, 500));
        assert_eq!(reporter.missing_ids().len(), 50);
        let progress = reporter.progress();
        assert_eq!(progress, vec![100, 200, 300, 400, 500]);
    }

    #[tokio::test]
    async fn test_scan_transport_error_still_clears_scroll() {
        let source = InMemorySearchClient::new().with_documents("src", numbered_documents(0..10));
        // Destination index does not exist.
        let destination = InMemorySearchClient::new();
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let sampler = ScanSampler::new(&source, "src", &matcher, settings(50), &reporter);
        let err = sampler.run().await.unwrap_err();
        assert!(matches!(err, VerifyError::Transport(_)));
        assert!(source
            .calls()
            .iter()
            .any(|c| matches!(c, ClientCall::ClearScroll { .. })));
    }
}
