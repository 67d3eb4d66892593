//! Random sampling of the source index.
//!
//! Pages come from a server-side random ranking keyed by a seed. A seed is
//! used for `random_checks_before_reset` consecutive pages, then replaced,
//! so one run draws from several independent orderings. The run stops once
//! the documents dispatched reach `check_percentage` of the destination
//! document count.

use futures::stream::{FuturesOrdered, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use search_client::{RandomPage, SearchClient};

use crate::document::{Batch, ContentSelector};
use crate::error::{PreconditionError, VerifyError};
use crate::matcher::BatchMatcher;
use crate::report::{CheckCategory, MatchTally, ProgressTracker};
use crate::reporter::{ReportEvent, Reporter};

/// Largest seed handed to the service. Older releases parse the seed as a
/// signed 32-bit integer.
pub const MAX_SEED: u64 = i32::MAX as u64;

/// Produces the seed and offset of every random page.
#[derive(Debug)]
pub struct SeedSchedule {
    rng: StdRng,
    pages_per_seed: usize,
    seed: Option<u64>,
    pages_drawn: usize,
}

impl SeedSchedule {
    /// `base_seed` makes the sequence of seeds reproducible.
    pub fn new(base_seed: Option<u64>, pages_per_seed: usize) -> Self {
        let rng = match base_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };
        Self {
            rng,
            pages_per_seed: pages_per_seed.max(1),
            seed: None,
            pages_drawn: 0,
        }
    }

    /// Seed currently in use, if any page was drawn.
    pub fn current_seed(&self) -> Option<u64> {
        self.seed
    }

    /// Parameters of the next page of `size` documents.
    pub fn next_page(&mut self, size: usize) -> RandomPage {
        let seed = match self.seed {
            Some(seed) if self.pages_drawn < self.pages_per_seed => seed,
            _ => self.reseed(),
        };
        let page = RandomPage {
            size,
            from: self.pages_drawn * size,
            seed,
        };
        self.pages_drawn += 1;
        page
    }

    /// Make the next page start a fresh ordering.
    pub fn force_reseed(&mut self) {
        self.pages_drawn = self.pages_per_seed;
    }

    fn reseed(&mut self) -> u64 {
        let seed = loop {
            let candidate = self.rng.random_range(0..=MAX_SEED);
            if self.seed != Some(candidate) {
                break candidate;
            }
        };
        tracing::debug!("Reseeding random ordering with {}", seed);
        self.seed = Some(seed);
        self.pages_drawn = 0;
        seed
    }
}

/// Settings of a random sampling run.
#[derive(Debug, Clone)]
pub struct RandomSettings {
    pub batch_size: usize,
    pub pages_per_seed: usize,
    /// Fraction of the destination document count to check.
    pub check_percentage: f64,
    pub max_in_flight: usize,
    pub check_content: bool,
    pub selector: ContentSelector,
    pub base_seed: Option<u64>,
}

/// Draws random pages from the source and checks them against the destination.
pub struct RandomSampler<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    source_index: &'a str,
    matcher: &'a BatchMatcher<'a, D>,
    settings: RandomSettings,
    reporter: &'a dyn Reporter,
}

impl<'a, S, D> RandomSampler<'a, S, D>
where
    S: SearchClient + ?Sized,
    D: SearchClient + ?Sized,
{
    pub fn new(
        source: &'a S,
        source_index: &'a str,
        matcher: &'a BatchMatcher<'a, D>,
        settings: RandomSettings,
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

    /// Run the sampling against a destination holding `destination_count`
    /// documents and return its tally.
    ///
    /// Fails with `EmptyDestination` when that count is zero and with
    /// `EmptySource` when a fresh ordering of the source is empty.
    pub async fn run(&self, destination_count: u64) -> Result<MatchTally, VerifyError> {
        if destination_count == 0 {
            return Err(PreconditionError::EmptyDestination.into());
        }
        tracing::info!(
            "Sampling {}% of {} destination documents from {}",
            self.settings.check_percentage * 100.0,
            destination_count,
            self.source_index
        );

        let mut schedule = SeedSchedule::new(self.settings.base_seed, self.settings.pages_per_seed);
        let mut tally = MatchTally::default();
        let mut progress = ProgressTracker::default();
        let mut in_flight = FuturesOrdered::new();
        let mut dispatched = 0u64;

        loop {
            while in_flight.len() < self.settings.max_in_flight
                && (dispatched as f64) / (destination_count as f64)
                    < self.settings.check_percentage
            {
                let page = schedule.next_page(self.settings.batch_size);
                let documents = self.source.random_search(self.source_index, page).await?;
                if documents.is_empty() {
                    if page.from == 0 {
                        return Err(PreconditionError::EmptySource.into());
                    }
                    tracing::debug!(
                        "Random ordering {} exhausted at offset {}",
                        page.seed,
                        page.from
                    );
                    schedule.force_reseed();
                    continue;
                }

                let batch = Batch::from_documents(
                    documents,
                    self.settings.check_content,
                    &self.settings.selector,
                );
                dispatched += batch.len() as u64;
                in_flight.push_back(self.matcher.check(batch));
            }

            let Some(result) = in_flight.next().await else {
                break;
            };
            tally.absorb(result?);
            if let Some(processed) = progress.advance(tally.total) {
                self.reporter.report(ReportEvent::Progress {
                    category: CheckCategory::Random,
                    processed,
                });
            }
        }

        tracing::info!(
            "Random sampling of {} finished: {} of {} documents matching",
            self.source_index,
            tally.matching,
            tally.total
        );
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered_documents, InMemorySearchClient, RecordingReporter};

    fn settings() -> RandomSettings {
        RandomSettings {
            batch_size: 10,
            pages_per_seed: 100,
            check_percentage: 0.1,
            max_in_flight: 1,
            check_content: true,
            selector: ContentSelector::default(),
            base_seed: Some(7),
        }
    }

    #[test]
    fn test_schedule_advances_offset_and_reseeds() {
        let mut schedule = SeedSchedule::new(Some(1), 3);
        let pages: Vec<RandomPage> = (0..7).map(|_| schedule.next_page(10)).collect();

        let offsets: Vec<usize> = pages.iter().map(|p| p.from).collect();
        assert_eq!(offsets, vec![0, 10, 20, 0, 10, 20, 0]);

        assert_eq!(pages[0].seed, pages[2].seed);
        assert_ne!(pages[2].seed, pages[3].seed);
        assert_eq!(pages[3].seed, pages[5].seed);
        assert_ne!(pages[5].seed, pages[6].seed);
        assert!(pages.iter().all(|p| p.seed <= MAX_SEED));
    }

    #[test]
    fn test_schedule_is_reproducible_with_base_seed() {
        let mut a = SeedSchedule::new(Some(42), 2);
        let mut b = SeedSchedule::new(Some(42), 2);
        for _ in 0..10 {
            assert_eq!(a.next_page(5), b.next_page(5));
        }
    }

    #[test]
    fn test_force_reseed_restarts_at_zero() {
        let mut schedule = SeedSchedule::new(Some(3), 100);
        let first = schedule.next_page(10);
        schedule.next_page(10);
        schedule.force_reseed();
        let next = schedule.next_page(10);
        assert_eq!(next.from, 0);
        assert_ne!(next.seed, first.seed);
        assert_eq!(schedule.current_seed(), Some(next.seed));
    }

    #[tokio::test]
    async fn test_samples_check_percentage_of_destination() {
        let docs = numbered_documents(0..1000);
        let source = InMemorySearchClient::new().with_documents("src", docs.clone());
        let destination = InMemorySearchClient::new().with_documents("dst", docs);
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let sampler = RandomSampler::new(&source, "src", &matcher, settings(), &reporter);
        let tally = sampler.run(1000).await.unwrap();

        assert_eq!(tally, MatchTally::new(100, 100));
        assert_eq!(source.random_pages().len(), 10);
        assert_eq!(reporter.progress(), vec![100]);
    }

    #[tokio::test]
    async fn test_reseeds_within_cadence() {
        let docs = numbered_documents(0..1000);
        let source = InMemorySearchClient::new().with_documents("src", docs.clone());
        let destination = InMemorySearchClient::new().with_documents("dst", docs);
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let settings = RandomSettings {
            pages_per_seed: 3,
            check_percentage: 0.25,
            max_in_flight: 3,
            ..settings()
        };
        let sampler = RandomSampler::new(&source, "src", &matcher, settings, &reporter);
        let tally = sampler.run(1000).await.unwrap();
        assert_eq!(tally.total, 250);

        let pages = source.random_pages();
        let mut run_length = 0;
        let mut previous: Option<u64> = None;
        for page in &pages {
            if previous == Some(page.seed) {
                run_length += 1;
            } else {
                run_length = 1;
            }
            assert!(run_length <= 3);
            previous = Some(page.seed);
        }
    }

    #[tokio::test]
    async fn test_short_source_reseeds_instead_of_stopping() {
        // 15 source documents, 100 destination documents, 20% wanted: the
        // sampler has to go through several orderings of the same 15.
        let source = InMemorySearchClient::new().with_documents("src", numbered_documents(0..15));
        let destination =
            InMemorySearchClient::new().with_documents("dst", numbered_documents(0..100));
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let settings = RandomSettings {
            check_percentage: 0.2,
            ..settings()
        };
        let sampler = RandomSampler::new(&source, "src", &matcher, settings, &reporter);
        let tally = sampler.run(100).await.unwrap();

        assert!(tally.total >= 20);
        assert_eq!(tally.matching, tally.total);
        let pages = source.random_pages();
        assert!(pages.iter().filter(|p| p.from == 0).count() >= 2);
    }

    #[tokio::test]
    async fn test_empty_destination_is_precondition_error() {
        let source = InMemorySearchClient::new().with_documents("src", numbered_documents(0..10));
        let destination = InMemorySearchClient::new().with_documents("dst", Vec::new());
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let sampler = RandomSampler::new(&source, "src", &matcher, settings(), &reporter);
        let err = sampler.run(0).await.unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Precondition(PreconditionError::EmptyDestination)
        ));
        assert!(source.random_pages().is_empty());
    }

    #[tokio::test]
    async fn test_empty_source_is_precondition_error() {
        let source = InMemorySearchClient::new().with_documents("src", Vec::new());
        let destination =
            InMemorySearchClient::new().with_documents("dst", numbered_documents(0..10));
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let sampler = RandomSampler::new(&source, "src", &matcher, settings(), &reporter);
        let err = sampler.run(10).await.unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Precondition(PreconditionError::EmptySource)
        ));
    }

    #[tokio::test]
    async fn test_missing_documents_lower_the_tally() {
        let docs = numbered_documents(0..1000);
        let source = InMemorySearchClient::new().with_documents("src", docs.clone());
        let destination = InMemorySearchClient::new()
            .with_documents("dst", docs)
            .with_document("dst", "doc-00000", serde_json::json!({ "body": "edited" }));
        let reporter = RecordingReporter::default();
        let matcher = BatchMatcher::new(&destination, "dst", ContentSelector::default(), &reporter);

        let settings = RandomSettings {
            check_percentage: 1.0,
            batch_size: 100,
            ..settings()
        };
        let sampler = RandomSampler::new(&source, "src", &matcher, settings, &reporter);
        let tally = sampler.run(1000).await.unwrap();

        // One full ordering covers every document exactly once.
        assert_eq!(tally, MatchTally::new(999, 1000));
        assert_eq!(reporter.mismatched_ids(), vec!["doc-00000"]);
    }
}
