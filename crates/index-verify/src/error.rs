//! Error types for the index verifier.

use search_client::TransportError;
use std::path::PathBuf;
use thiserror::Error;

use crate::report::CheckCategory;

/// Errors that abort a verification run.
///
/// A FAILURE verdict is not an error: it is reported and the run continues.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Network or service failure talking to either deployment.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A zero-denominator condition that makes a ratio meaningless.
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for `VerifyConfig`.
    #[error("failed to parse config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Conditions under which no defensible ratio can be computed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// No documents were checked, so matching/total is undefined.
    #[error("no {0} were checked; cannot compute a match ratio")]
    EmptyTally(CheckCategory),

    /// The destination holds no documents, so a percentage of it is undefined.
    #[error("destination index reports 0 documents; cannot sample a percentage of an empty index")]
    EmptyDestination,

    /// A fresh random ordering of the source returned nothing.
    #[error("source index returned no documents for a fresh random ordering")]
    EmptySource,
}
