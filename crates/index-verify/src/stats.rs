//! Document count and store size comparison.

use search_client::{IndexStats, SearchClient};

use crate::error::VerifyError;
use crate::report::Verdict;
use crate::reporter::{ReportEvent, Reporter};

/// Stats of both indices with the verdicts derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsComparison {
    pub source: IndexStats,
    pub destination: IndexStats,
    pub document_count: Verdict,
    pub store_size: Verdict,
}

impl StatsComparison {
    pub fn verdicts(&self) -> [&Verdict; 2] {
        [&self.document_count, &self.store_size]
    }
}

/// Fetch the stats of both indices and report the document count and index
/// size verdicts.
pub async fn compare_stats<S, D>(
    source: &S,
    source_index: &str,
    destination: &D,
    destination_index: &str,
    reporter: &dyn Reporter,
) -> Result<StatsComparison, VerifyError>
where
    S: SearchClient + ?Sized,
    D: SearchClient + ?Sized,
{
    let source_stats = source.stats(source_index).await?;
    let destination_stats = destination.stats(destination_index).await?;
    tracing::debug!(
        "Stats of {}: {:?}, stats of {}: {:?}",
        source_index,
        source_stats,
        destination_index,
        destination_stats
    );

    let comparison = StatsComparison {
        source: source_stats,
        destination: destination_stats,
        document_count: Verdict::equality(
            "Document count",
            source_stats.document_count,
            destination_stats.document_count,
        ),
        store_size: Verdict::equality(
            "Index size",
            source_stats.store_size_bytes,
            destination_stats.store_size_bytes,
        ),
    };

    for verdict in comparison.verdicts() {
        reporter.report(ReportEvent::Verdict(verdict.clone()));
    }
    Ok(comparison)
}
