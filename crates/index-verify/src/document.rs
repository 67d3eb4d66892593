//! Document references, snapshots and batches.

use std::collections::HashMap;

use search_client::SourceDocument;
use serde_json::Value;

/// Which part of a stored document is compared between indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSelector {
    /// One top-level `_source` field.
    Field(String),
    /// The whole `_source`.
    WholeSource,
}

impl ContentSelector {
    /// Extract the comparable content of a `_source`. A missing field
    /// compares as `null`.
    pub fn extract(&self, source: &Value) -> Value {
        match self {
            Self::Field(name) => source.get(name).cloned().unwrap_or(Value::Null),
            Self::WholeSource => source.clone(),
        }
    }
}

impl Default for ContentSelector {
    fn default() -> Self {
        Self::Field("body".to_string())
    }
}

/// Identifies one document in an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub id: String,
}

/// A document id with its comparable content.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub body: Value,
}

impl DocumentSnapshot {
    pub fn from_source(document: SourceDocument, selector: &ContentSelector) -> Self {
        let body = selector.extract(&document.source);
        Self {
            id: document.id,
            body,
        }
    }
}

/// Documents checked against the destination with one multi-get.
///
/// `expected` holds the id -> content map when content is checked; without
/// it only presence is checked.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    refs: Vec<DocumentRef>,
    expected: Option<HashMap<String, Value>>,
}

impl Batch {
    /// Presence-only batch.
    pub fn refs_only(refs: Vec<DocumentRef>) -> Self {
        Self {
            refs,
            expected: None,
        }
    }

    /// Batch that also checks content.
    pub fn with_content(snapshots: Vec<DocumentSnapshot>) -> Self {
        let mut refs = Vec::with_capacity(snapshots.len());
        let mut expected = HashMap::with_capacity(snapshots.len());
        for snapshot in snapshots {
            refs.push(DocumentRef {
                id: snapshot.id.clone(),
            });
            expected.insert(snapshot.id, snapshot.body);
        }
        Self {
            refs,
            expected: Some(expected),
        }
    }

    /// Build a batch from raw source documents.
    pub fn from_documents(
        documents: Vec<SourceDocument>,
        check_content: bool,
        selector: &ContentSelector,
    ) -> Self {
        if check_content {
            Self::with_content(
                documents
                    .into_iter()
                    .map(|doc| DocumentSnapshot::from_source(doc, selector))
                    .collect(),
            )
        } else {
            Self::refs_only(
                documents
                    .into_iter()
                    .map(|doc| DocumentRef { id: doc.id })
                    .collect(),
            )
        }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn checks_content(&self) -> bool {
        self.expected.is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.refs.iter().map(|r| r.id.clone()).collect()
    }

    /// Expected content of a document, when content is checked.
    pub fn expected(&self, id: &str) -> Option<&Value> {
        self.expected.as_ref().and_then(|m| m.get(id))
    }
}
