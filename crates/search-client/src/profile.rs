//! Version profiles for search service request and response shapes.
//!
//! Every supported service version gets one `ServiceProfile` implementation.
//! Shared behaviour lives in the trait's default methods; a profile only
//! overrides what differs for its release range.

use serde_json::{json, Value};

use crate::error::TransportError;
use crate::version::ServiceVersion;

/// How a scroll cursor over a whole index is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStrategy {
    /// `search_type=scan`: the first response carries no hits, only a scroll id.
    Scan,
    /// Plain scroll sorted by `_doc`: the first response already carries hits.
    SortedByDoc,
}

/// Request and response shapes of one service version profile.
pub trait ServiceProfile: std::fmt::Debug + Send + Sync {
    /// Version profile implemented.
    fn version(&self) -> ServiceVersion;

    /// Name of the multi-get field that flags a document as present.
    fn presence_field(&self) -> &'static str {
        "found"
    }

    /// Whether a multi-get response entry describes a stored document.
    fn is_present(&self, entry: &Value) -> bool {
        entry
            .get(self.presence_field())
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Extract the mapping of the single index in a `_mapping` response.
    ///
    /// The response is keyed by concrete index name. From 1.x on the mapping
    /// is nested one level deeper, under `mappings`.
    fn normalize_mapping(&self, response: Value) -> Result<Value, TransportError> {
        let entry = single_index_entry(response, "mapping")?;
        match entry {
            Value::Object(mut fields) => fields
                .remove("mappings")
                .ok_or_else(|| TransportError::unexpected("mapping response has no 'mappings' key")),
            other => Err(TransportError::unexpected(format!(
                "mapping entry is not an object: {other}"
            ))),
        }
    }

    /// How to open a scroll over a whole index.
    fn scroll_strategy(&self) -> ScrollStrategy {
        ScrollStrategy::SortedByDoc
    }

    /// Whether scroll continuation and clearing send the scroll id in a JSON
    /// body rather than in the URL.
    fn scroll_id_in_body(&self) -> bool {
        true
    }

    /// The `random_score` clause for a seeded random ordering.
    fn random_score(&self, seed: u64) -> Value {
        json!({ "seed": seed })
    }
}

/// Elasticsearch 0.90.x.
#[derive(Debug, Clone, Copy, Default)]
pub struct Legacy090Profile;

impl ServiceProfile for Legacy090Profile {
    fn version(&self) -> ServiceVersion {
        ServiceVersion::V0_90
    }

    fn presence_field(&self) -> &'static str {
        "exists"
    }

    fn normalize_mapping(&self, response: Value) -> Result<Value, TransportError> {
        single_index_entry(response, "mapping")
    }

    fn scroll_strategy(&self) -> ScrollStrategy {
        ScrollStrategy::Scan
    }

    fn scroll_id_in_body(&self) -> bool {
        false
    }
}

/// Elasticsearch 1.x through 4.x.
#[derive(Debug, Clone, Copy, Default)]
pub struct V1Profile;

impl ServiceProfile for V1Profile {
    fn version(&self) -> ServiceVersion {
        ServiceVersion::V1
    }

    fn scroll_strategy(&self) -> ScrollStrategy {
        ScrollStrategy::Scan
    }

    fn scroll_id_in_body(&self) -> bool {
        false
    }
}

/// Elasticsearch 5.x and 6.x.
#[derive(Debug, Clone, Copy, Default)]
pub struct V5Profile;

impl ServiceProfile for V5Profile {
    fn version(&self) -> ServiceVersion {
        ServiceVersion::V5
    }
}

/// Elasticsearch 7.x and later.
#[derive(Debug, Clone, Copy, Default)]
pub struct V7Profile;

impl ServiceProfile for V7Profile {
    fn version(&self) -> ServiceVersion {
        ServiceVersion::V7
    }

    fn random_score(&self, seed: u64) -> Value {
        json!({ "seed": seed, "field": "_seq_no" })
    }
}

/// Select the profile implementing a service version.
pub fn profile_for(version: ServiceVersion) -> Box<dyn ServiceProfile> {
    match version {
        ServiceVersion::V0_90 => Box::new(Legacy090Profile),
        ServiceVersion::V1 => Box::new(V1Profile),
        ServiceVersion::V5 => Box::new(V5Profile),
        ServiceVersion::V7 => Box::new(V7Profile),
    }
}

/// Take the value of the only entry of a response keyed by index name.
///
/// An alias resolving to several concrete indices is rejected: the verifier
/// compares exactly one index on each side.
pub fn single_index_entry(response: Value, what: &str) -> Result<Value, TransportError> {
    let Value::Object(entries) = response else {
        return Err(TransportError::unexpected(format!(
            "{what} response is not an object"
        )));
    };
    if entries.len() > 1 {
        let names: Vec<&String> = entries.keys().collect();
        return Err(TransportError::unexpected(format!(
            "{what} response covers several indices: {names:?}"
        )));
    }
    entries
        .into_iter()
        .next()
        .map(|(_, value)| value)
        .ok_or_else(|| TransportError::unexpected(format!("{what} response is empty")))
}
