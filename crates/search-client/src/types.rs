//! Document and index types exchanged with a search service.

use serde_json::Value;

/// Aggregate statistics of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    /// Number of live documents in the index.
    pub document_count: u64,
    /// On-disk size of the index in bytes.
    pub store_size_bytes: u64,
}

/// A document as returned by a search or scroll: its id and raw `_source`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub id: String,
    pub source: Value,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// One page of a scroll cursor.
///
/// An empty `documents` list means the cursor is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    /// Id to pass to the next scroll call, when the service returned one.
    pub scroll_id: Option<String>,
    pub documents: Vec<SourceDocument>,
}

/// Parameters of one randomly ranked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomPage {
    /// Page size (top-K).
    pub size: usize,
    /// Offset into the random ordering.
    pub from: usize,
    /// Seed of the server-side random-ranking function.
    pub seed: u64,
}

/// One result of a multi-get request.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiGetEntry {
    pub id: String,
    /// `_source` of the stored document, `None` when it is absent.
    pub source: Option<Value>,
}

impl MultiGetEntry {
    pub fn found(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source: Some(source),
        }
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.source.is_some()
    }
}
