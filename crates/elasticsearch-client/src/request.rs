//! Request bodies sent to the search service.

use search_client::{ScrollStrategy, ServiceProfile};
use serde_json::{json, Value};

/// Body of the request that opens a scroll over a whole index.
pub fn open_scroll_body(profile: &dyn ServiceProfile, page_size: usize) -> Value {
    match profile.scroll_strategy() {
        ScrollStrategy::Scan => json!({
            "size": page_size,
            "query": { "match_all": {} }
        }),
        ScrollStrategy::SortedByDoc => json!({
            "size": page_size,
            "sort": ["_doc"],
            "query": { "match_all": {} }
        }),
    }
}

/// Body of a randomly ranked page request.
pub fn random_search_body(
    profile: &dyn ServiceProfile,
    size: usize,
    from: usize,
    seed: u64,
) -> Value {
    json!({
        "size": size,
        "from": from,
        "query": {
            "function_score": {
                "functions": [
                    { "random_score": profile.random_score(seed) }
                ]
            }
        }
    })
}

/// Body of a multi-get request for a batch of ids.
pub fn multi_get_body(ids: &[String]) -> Value {
    let docs: Vec<Value> = ids.iter().map(|id| json!({ "_id": id })).collect();
    json!({ "docs": docs })
}

/// Body of a scroll continuation for profiles that send the id as JSON.
pub fn scroll_continue_body(scroll_id: &str, keep_alive: &str) -> Value {
    json!({ "scroll": keep_alive, "scroll_id": scroll_id })
}

/// Body of a scroll clear for profiles that send the id as JSON.
pub fn clear_scroll_body(scroll_id: &str) -> Value {
    json!({ "scroll_id": [scroll_id] })
}
