//! Service version profile enumeration.

use serde::Deserialize;
use thiserror::Error;

/// Supported search service version profiles.
///
/// Each variant covers a range of releases that share request and response
/// shapes. Used to select a `ServiceProfile` at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ServiceVersion {
    /// 0.90.x: mapping is not nested under `mappings`, multi-get reports `exists`.
    V0_90,
    /// 1.x to 4.x: mapping nested under `mappings`, scroll opened with `search_type=scan`.
    V1,
    /// 5.x and 6.x: scroll sorted by `_doc`, scroll ids sent in the request body.
    V5,
    /// 7.x and later: random scoring needs an explicit `field`.
    V7,
}

/// Error returned when a version string cannot be mapped to a profile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid service version '{0}': expected one of 0.90, 1, 5, 7")]
pub struct ParseVersionError(pub String);

impl ServiceVersion {
    /// Map a release number to its profile.
    pub fn from_release(major: u64, minor: u64) -> Result<Self, ParseVersionError> {
        match (major, minor) {
            (0, minor) if minor >= 90 => Ok(Self::V0_90),
            (1..=4, _) => Ok(Self::V1),
            (5..=6, _) => Ok(Self::V5),
            (major, _) if major >= 7 => Ok(Self::V7),
            _ => Err(ParseVersionError(format!("{major}.{minor}"))),
        }
    }

    /// The most recent profile, used when detection fails.
    pub fn latest() -> Self {
        Self::V7
    }
}

impl std::fmt::Display for ServiceVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V0_90 => write!(f, "0.90"),
            Self::V1 => write!(f, "1.x"),
            Self::V5 => write!(f, "5.x"),
            Self::V7 => write!(f, "7.x"),
        }
    }
}

impl std::str::FromStr for ServiceVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let normalized = normalized.strip_prefix('v').unwrap_or(&normalized);
        let normalized = normalized.strip_suffix(".x").unwrap_or(normalized);

        let mut parts = normalized.split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u64>().ok())
            .ok_or_else(|| ParseVersionError(s.to_string()))?;
        let minor = match parts.next() {
            Some(p) => p
                .parse::<u64>()
                .map_err(|_| ParseVersionError(s.to_string()))?,
            None => 0,
        };

        // "0" alone is ambiguous; only 0.90 is supported.
        if major == 0 && minor < 90 {
            return Err(ParseVersionError(s.to_string()));
        }

        Self::from_release(major, minor).map_err(|_| ParseVersionError(s.to_string()))
    }
}

impl TryFrom<String> for ServiceVersion {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
