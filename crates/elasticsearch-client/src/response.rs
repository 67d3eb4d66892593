//! Parsing of search service responses into client types.

use search_client::{
    single_index_entry, IndexStats, MultiGetEntry, ScrollPage, ServiceProfile, SourceDocument,
    TransportError,
};
use serde_json::Value;

/// Parse an `_stats` response for a single index.
pub fn parse_stats(response: Value) -> Result<IndexStats, TransportError> {
    let indices = match response {
        Value::Object(mut fields) => fields
            .remove("indices")
            .ok_or_else(|| TransportError::unexpected("stats response has no 'indices' key"))?,
        _ => return Err(TransportError::unexpected("stats response is not an object")),
    };
    let entry = single_index_entry(indices, "stats")?;
    let total = entry
        .get("total")
        .ok_or_else(|| TransportError::unexpected("stats entry has no 'total' section"))?;

    let document_count = total
        .pointer("/docs/count")
        .and_then(Value::as_u64)
        .ok_or_else(|| TransportError::unexpected("stats entry has no docs.count"))?;
    let store_size_bytes = total
        .pointer("/store/size_in_bytes")
        .and_then(Value::as_u64)
        .ok_or_else(|| TransportError::unexpected("stats entry has no store.size_in_bytes"))?;

    Ok(IndexStats {
        document_count,
        store_size_bytes,
    })
}

/// Parse the `hits.hits` array of a search or scroll response.
pub fn parse_hits(response: &Value) -> Result<Vec<SourceDocument>, TransportError> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| TransportError::unexpected("search response has no hits.hits array"))?;

    hits.iter()
        .map(|hit| -> Result<SourceDocument, TransportError> {
            let id = hit
                .get("_id")
                .and_then(Value::as_str)
                .ok_or_else(|| TransportError::unexpected(format!("hit without _id: {hit}")))?;
            let source = hit.get("_source").cloned().unwrap_or(Value::Null);
            Ok(SourceDocument::new(id, source))
        })
        .collect()
}

/// Parse a scroll response into its next scroll id and documents.
pub fn parse_scroll_page(response: &Value) -> Result<ScrollPage, TransportError> {
    let scroll_id = response
        .get("_scroll_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let documents = parse_hits(response)?;
    Ok(ScrollPage {
        scroll_id,
        documents,
    })
}

/// Parse a `_mget` response using the profile's presence flag.
pub fn parse_multi_get(
    profile: &dyn ServiceProfile,
    response: &Value,
) -> Result<Vec<MultiGetEntry>, TransportError> {
    let docs = response
        .get("docs")
        .and_then(Value::as_array)
        .ok_or_else(|| TransportError::unexpected("multi-get response has no docs array"))?;

    docs.iter()
        .map(|doc| -> Result<MultiGetEntry, TransportError> {
            let id = doc
                .get("_id")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    TransportError::unexpected(format!("multi-get entry without _id: {doc}"))
                })?;
            if profile.is_present(doc) {
                let source = doc.get("_source").cloned().unwrap_or(Value::Null);
                Ok(MultiGetEntry::found(id, source))
            } else {
                Ok(MultiGetEntry::missing(id))
            }
        })
        .collect()
}
