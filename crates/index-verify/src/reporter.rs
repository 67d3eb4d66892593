//! Reporter sink for verification events.
//!
//! Control flow emits structured events; a `Reporter` decides how they are
//! rendered. `ConsoleReporter` prints verdict lines to stdout and logs
//! per-document findings through `tracing`.

use serde_json::Value;

use crate::report::{CheckCategory, Verdict};
use crate::schema::SchemaDifference;

/// A single event produced during verification.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    /// Final verdict of one check.
    Verdict(Verdict),
    /// One divergent node of the mapping diff.
    SchemaDifference(SchemaDifference),
    /// A document present in the source is absent from the destination.
    MissingDocument {
        id: String,
        expected: Option<Value>,
    },
    /// A document exists on both sides with different content.
    ContentMismatch {
        id: String,
        expected: Value,
        actual: Value,
    },
    /// Documents processed so far by a sampler.
    Progress {
        category: CheckCategory,
        processed: u64,
    },
}

/// Sink for verification events.
pub trait Reporter: Send + Sync {
    fn report(&self, event: ReportEvent);
}

/// Reporter writing verdicts and schema differences to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: ReportEvent) {
        match event {
            ReportEvent::Verdict(verdict) => println!("{verdict}"),
            ReportEvent::SchemaDifference(difference) => println!("    {difference}"),
            ReportEvent::MissingDocument { id, expected } => match expected {
                Some(body) => tracing::error!("Document missing with id: {}, body: {}", id, body),
                None => tracing::error!("Document missing with id: {}", id),
            },
            ReportEvent::ContentMismatch {
                id,
                expected,
                actual,
            } => {
                tracing::error!("Document with id {} does not match body: {}", id, expected);
                tracing::error!("Found body: {}", actual);
            }
            ReportEvent::Progress {
                category,
                processed,
            } => tracing::info!("processed {} {}", processed, category),
        }
    }
}
