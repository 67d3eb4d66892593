//! Tallies, verdicts and the run summary.

use std::fmt;

use crate::error::PreconditionError;

/// Sampling check categories, each with its own tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckCategory {
    /// Full scan of the source index.
    Scan,
    /// Random sampling of the source index.
    Random,
}

impl CheckCategory {
    /// Verdict description for the category.
    pub fn verdict_description(&self) -> String {
        format!("{self} matching")
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => write!(f, "scanned documents"),
            Self::Random => write!(f, "random documents"),
        }
    }
}

/// Running count of matching documents out of documents checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchTally {
    pub matching: u64,
    pub total: u64,
}

impl MatchTally {
    pub fn new(matching: u64, total: u64) -> Self {
        Self { matching, total }
    }

    /// Fold another tally into this one.
    pub fn absorb(&mut self, other: MatchTally) {
        self.matching += other.matching;
        self.total += other.total;
    }

    /// matching / total. An empty tally has no ratio.
    pub fn ratio(&self, category: CheckCategory) -> Result<f64, PreconditionError> {
        if self.total == 0 {
            return Err(PreconditionError::EmptyTally(category));
        }
        Ok(self.matching as f64 / self.total as f64)
    }

    /// Whole percentage of matching documents, truncated.
    pub fn percent(&self, category: CheckCategory) -> Result<u64, PreconditionError> {
        if self.total == 0 {
            return Err(PreconditionError::EmptyTally(category));
        }
        Ok(self.matching * 100 / self.total)
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failure,
}

impl Outcome {
    pub fn from_pass(pass: bool) -> Self {
        if pass {
            Self::Ok
        } else {
            Self::Failure
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Numbers shown after a verdict description.
#[derive(Debug, Clone, PartialEq)]
pub enum VerdictDetail {
    /// `(matched out of total, percent%)`
    Ratio { matched: u64, total: u64, percent: u64 },
    /// `(source = destination)`
    Equality { source: u64, destination: u64 },
    /// No numbers.
    None,
}

/// Result of one check, rendered as a single report line.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub description: String,
    pub detail: VerdictDetail,
}

impl Verdict {
    /// Verdict for a sampling tally: OK when the ratio strictly exceeds the
    /// threshold.
    pub fn from_tally(
        category: CheckCategory,
        tally: &MatchTally,
        threshold: f64,
    ) -> Result<Self, PreconditionError> {
        let ratio = tally.ratio(category)?;
        Ok(Self {
            outcome: Outcome::from_pass(ratio > threshold),
            description: category.verdict_description(),
            detail: VerdictDetail::Ratio {
                matched: tally.matching,
                total: tally.total,
                percent: tally.percent(category)?,
            },
        })
    }

    /// Verdict for a metric that must be equal on both sides.
    pub fn equality(description: impl Into<String>, source: u64, destination: u64) -> Self {
        Self {
            outcome: Outcome::from_pass(source == destination),
            description: description.into(),
            detail: VerdictDetail::Equality {
                source,
                destination,
            },
        }
    }

    pub fn plain(outcome: Outcome, description: impl Into<String>) -> Self {
        Self {
            outcome,
            description: description.into(),
            detail: VerdictDetail::None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.outcome, self.description)?;
        match &self.detail {
            VerdictDetail::Ratio {
                matched,
                total,
                percent,
            } => write!(f, " ({matched} out of {total}, {percent}%)"),
            VerdictDetail::Equality {
                source,
                destination,
            } => {
                let op = if source == destination { "=" } else { "!=" };
                write!(f, " ({source} {op} {destination})")
            }
            VerdictDetail::None => Ok(()),
        }
    }
}

/// Emits a progress event each time the processed count crosses a multiple
/// of the interval.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    interval: u64,
    last_mark: u64,
}

impl ProgressTracker {
    pub const DEFAULT_INTERVAL: u64 = 100;

    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            last_mark: 0,
        }
    }

    /// Returns the processed count when a new multiple was crossed.
    pub fn advance(&mut self, processed: u64) -> Option<u64> {
        let mark = processed / self.interval;
        if mark > self.last_mark {
            self.last_mark = mark;
            Some(processed)
        } else {
            None
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

/// Every verdict of one run.
#[derive(Debug, Clone, Default)]
pub struct VerificationSummary {
    pub verdicts: Vec<Verdict>,
}

impl VerificationSummary {
    /// Largest exit status produced by summing failures.
    pub const MAX_EXIT_CODE: i32 = 100;

    pub fn push(&mut self, verdict: Verdict) {
        self.verdicts.push(verdict);
    }

    pub fn failures(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|v| v.outcome.is_failure())
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }

    /// Process exit status: the number of FAILURE verdicts, capped.
    pub fn exit_code(&self) -> i32 {
        (self.failures() as i32).min(Self::MAX_EXIT_CODE)
    }
}
