//! In-memory collaborators for exercising the verifier without a cluster.
//!
//! `InMemorySearchClient` serves stats, mappings, scroll pages, seeded random
//! pages and multi-gets from ordered maps, and records every call so tests
//! can assert on request patterns. `RecordingReporter` captures events.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use search_client::{
    IndexStats, MultiGetEntry, RandomPage, ScrollPage, SearchClient, SourceDocument,
    TransportError,
};
use serde_json::{json, Value};

use crate::report::Verdict;
use crate::reporter::{ReportEvent, Reporter};
use crate::schema::SchemaDifference;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    Stats { index: String },
    Mapping { index: String },
    OpenScroll { index: String, page_size: usize },
    NextScroll { scroll_id: String },
    ClearScroll { scroll_id: String },
    RandomSearch { index: String, page: RandomPage },
    MultiGet { index: String, ids: Vec<String> },
}

/// Contents of one in-memory index.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    pub documents: BTreeMap<String, Value>,
    pub mapping: Value,
    /// Overrides the computed store size.
    pub store_size_bytes: Option<u64>,
    /// Overrides the document count reported by stats.
    pub reported_count: Option<u64>,
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self {
            documents: BTreeMap::new(),
            mapping: json!({}),
            store_size_bytes: None,
            reported_count: None,
        }
    }
}

impl InMemoryIndex {
    fn stats(&self) -> IndexStats {
        let computed_size: u64 = self
            .documents
            .iter()
            .map(|(id, source)| (id.len() + source.to_string().len()) as u64)
            .sum();
        IndexStats {
            document_count: self
                .reported_count
                .unwrap_or(self.documents.len() as u64),
            store_size_bytes: self.store_size_bytes.unwrap_or(computed_size),
        }
    }
}

#[derive(Debug, Clone)]
struct ScrollState {
    index: String,
    offset: usize,
    page_size: usize,
}

/// `SearchClient` backed by in-memory indices.
#[derive(Debug, Default)]
pub struct InMemorySearchClient {
    indices: HashMap<String, InMemoryIndex>,
    scroll_page_size: Option<usize>,
    scrolls: Mutex<HashMap<String, ScrollState>>,
    next_scroll: AtomicU64,
    calls: Mutex<Vec<ClientCall>>,
}

impl InMemorySearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add documents to an index, creating it when needed.
    pub fn with_documents<I>(mut self, index: &str, documents: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.indices
            .entry(index.to_string())
            .or_default()
            .documents
            .extend(documents);
        self
    }

    /// Insert or replace one document.
    pub fn with_document(self, index: &str, id: &str, source: Value) -> Self {
        self.with_documents(index, [(id.to_string(), source)])
    }

    pub fn without_document(mut self, index: &str, id: &str) -> Self {
        if let Some(idx) = self.indices.get_mut(index) {
            idx.documents.remove(id);
        }
        self
    }

    pub fn with_mapping(mut self, index: &str, mapping: Value) -> Self {
        self.indices.entry(index.to_string()).or_default().mapping = mapping;
        self
    }

    pub fn with_store_size(mut self, index: &str, bytes: u64) -> Self {
        self.indices
            .entry(index.to_string())
            .or_default()
            .store_size_bytes = Some(bytes);
        self
    }

    pub fn with_reported_count(mut self, index: &str, count: u64) -> Self {
        self.indices
            .entry(index.to_string())
            .or_default()
            .reported_count = Some(count);
        self
    }

    /// Serve scroll pages of this size regardless of the requested size.
    pub fn with_scroll_page_size(mut self, size: usize) -> Self {
        self.scroll_page_size = Some(size);
        self
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        lock(&self.calls).clone()
    }

    pub fn multi_get_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ClientCall::MultiGet { .. }))
            .count()
    }

    pub fn random_pages(&self) -> Vec<RandomPage> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                ClientCall::RandomSearch { page, .. } => Some(*page),
                _ => None,
            })
            .collect()
    }

    /// Scroll cursors still open.
    pub fn open_scrolls(&self) -> usize {
        lock(&self.scrolls).len()
    }

    fn record(&self, call: ClientCall) {
        lock(&self.calls).push(call);
    }

    fn index(&self, index: &str) -> Result<&InMemoryIndex, TransportError> {
        self.indices
            .get(index)
            .ok_or_else(|| TransportError::IndexNotFound(index.to_string()))
    }

    fn scroll_page(&self, scroll_id: &str) -> Result<ScrollPage, TransportError> {
        let mut scrolls = lock(&self.scrolls);
        let state = scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| TransportError::UnknownScroll(scroll_id.to_string()))?;
        let index = self.index(&state.index)?;

        let documents: Vec<SourceDocument> = index
            .documents
            .iter()
            .skip(state.offset)
            .take(state.page_size)
            .map(|(id, source)| SourceDocument::new(id.clone(), source.clone()))
            .collect();
        state.offset += documents.len();

        Ok(ScrollPage {
            scroll_id: Some(scroll_id.to_string()),
            documents,
        })
    }
}

#[async_trait::async_trait]
impl SearchClient for InMemorySearchClient {
    async fn stats(&self, index: &str) -> Result<IndexStats, TransportError> {
        self.record(ClientCall::Stats {
            index: index.to_string(),
        });
        Ok(self.index(index)?.stats())
    }

    async fn mapping(&self, index: &str) -> Result<Value, TransportError> {
        self.record(ClientCall::Mapping {
            index: index.to_string(),
        });
        Ok(self.index(index)?.mapping.clone())
    }

    async fn open_scroll(
        &self,
        index: &str,
        page_size: usize,
    ) -> Result<ScrollPage, TransportError> {
        self.record(ClientCall::OpenScroll {
            index: index.to_string(),
            page_size,
        });
        self.index(index)?;

        let scroll_id = format!("scroll-{}", self.next_scroll.fetch_add(1, Ordering::SeqCst));
        lock(&self.scrolls).insert(
            scroll_id.clone(),
            ScrollState {
                index: index.to_string(),
                offset: 0,
                page_size: self.scroll_page_size.unwrap_or(page_size),
            },
        );
        self.scroll_page(&scroll_id)
    }

    async fn next_scroll(&self, scroll_id: &str) -> Result<ScrollPage, TransportError> {
        self.record(ClientCall::NextScroll {
            scroll_id: scroll_id.to_string(),
        });
        self.scroll_page(scroll_id)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), TransportError> {
        self.record(ClientCall::ClearScroll {
            scroll_id: scroll_id.to_string(),
        });
        lock(&self.scrolls)
            .remove(scroll_id)
            .map(|_| ())
            .ok_or_else(|| TransportError::UnknownScroll(scroll_id.to_string()))
    }

    async fn random_search(
        &self,
        index: &str,
        page: RandomPage,
    ) -> Result<Vec<SourceDocument>, TransportError> {
        self.record(ClientCall::RandomSearch {
            index: index.to_string(),
            page,
        });
        let idx = self.index(index)?;

        let mut ids: Vec<&String> = idx.documents.keys().collect();
        let mut rng = StdRng::seed_from_u64(page.seed);
        ids.shuffle(&mut rng);

        Ok(ids
            .into_iter()
            .skip(page.from)
            .take(page.size)
            .map(|id| SourceDocument::new(id.clone(), idx.documents[id].clone()))
            .collect())
    }

    async fn multi_get(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<Vec<MultiGetEntry>, TransportError> {
        self.record(ClientCall::MultiGet {
            index: index.to_string(),
            ids: ids.to_vec(),
        });
        let idx = self.index(index)?;

        Ok(ids
            .iter()
            .map(|id| match idx.documents.get(id) {
                Some(source) => MultiGetEntry::found(id.clone(), source.clone()),
                None => MultiGetEntry::missing(id.clone()),
            })
            .collect())
    }
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ReportEvent> {
        lock(&self.events).clone()
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Verdict(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    /// Verdicts rendered as report lines.
    pub fn verdict_lines(&self) -> Vec<String> {
        self.verdicts().iter().map(ToString::to_string).collect()
    }

    pub fn schema_differences(&self) -> Vec<SchemaDifference> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReportEvent::SchemaDifference(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn missing_ids(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReportEvent::MissingDocument { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn mismatched_ids(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReportEvent::ContentMismatch { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Processed counts of every progress event, in emission order.
    pub fn progress(&self) -> Vec<u64> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Progress { processed, .. } => Some(*processed),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: ReportEvent) {
        lock(&self.events).push(event);
    }
}

/// Documents `doc-{start}..doc-{end}` with a `body` field, ids zero-padded so
/// that map order equals numeric order.
pub fn numbered_documents(range: std::ops::Range<u32>) -> Vec<(String, Value)> {
    range
        .map(|i| {
            (
                format!("doc-{i:05}"),
                json!({ "body": format!("body of document {i}"), "n": i }),
            )
        })
        .collect()
}
