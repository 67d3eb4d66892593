//! Sampling-based verifier for copied search indices.
//!
//! Compares a source and a destination index in three steps: aggregate
//! stats, field mappings, and document content. Content is checked either
//! by scanning the whole source index or by drawing random pages from it
//! until a percentage of the destination has been checked. Every step
//! produces a verdict; the run's exit status is the number of failures.
//!
//! # Example
//!
//! ```ignore
//! use index_verify::{ConsoleReporter, IndexVerifier, VerifyConfig};
//!
//! let reporter = ConsoleReporter;
//! let verifier = IndexVerifier::new(&old, "articles", &new, "articles", VerifyConfig::default(), &reporter)?;
//! let summary = verifier.verify().await?;
//! std::process::exit(summary.exit_code());
//! ```

pub mod args;
pub mod config;
pub mod document;
pub mod error;
pub mod matcher;
pub mod random;
pub mod report;
pub mod reporter;
pub mod scan;
pub mod schema;
pub mod stats;
pub mod testing;
pub mod verifier;

pub use args::{IndexEndpoint, VerifyArgs};
pub use config::{SamplingMode, VerifyConfig, MAX_RESULT_WINDOW};
pub use document::{Batch, ContentSelector, DocumentRef, DocumentSnapshot};
pub use error::{PreconditionError, VerifyError};
pub use matcher::BatchMatcher;
pub use random::{RandomSampler, RandomSettings, SeedSchedule};
pub use report::{CheckCategory, MatchTally, Outcome, Verdict, VerificationSummary};
pub use reporter::{ConsoleReporter, ReportEvent, Reporter};
pub use scan::{DocumentScanner, ScanSampler, ScanSettings};
pub use schema::{compare_mappings, diff_mappings, DifferenceKind, SchemaDifference};
pub use stats::{compare_stats, StatsComparison};
pub use verifier::IndexVerifier;
