//! Remote followers collection pagination
//!
//! Walks an ActivityStreams OrderedCollection, following `first`/`next` page
//! links until the collection is exhausted or the configured page bound is
//! hit. Member order follows collection page order.

use super::{ACTIVITY_JSON, get_json};
use crate::error::AppError;

/// Retrieve member IDs from a remote collection.
///
/// Handles inline `orderedItems`/`items`, a `first` page given as either a
/// URL or an embedded page object, and `next` chains. A page failure mid-chain
/// terminates pagination with the members gathered so far; only a failure to
/// fetch the collection root is an error.
///
/// # Arguments
/// * `collection_url` - The collection root URL (an actor's `followers`)
/// * `max_pages` - Upper bound on pages fetched over the network
pub async fn fetch_collection_members(
    http_client: &reqwest::Client,
    collection_url: &str,
    max_pages: usize,
) -> Result<Vec<String>, AppError> {
    let root = get_json(http_client, collection_url, ACTIVITY_JSON, "collection").await?;

    let mut members = extract_member_ids(&root);
    let mut pages_fetched = 0usize;
    let mut next = page_ref(root.get("first"));

    while let Some(page) = next {
        let document = match page {
            PageRef::Embedded(value) => value,
            PageRef::Url(url) => {
                if pages_fetched >= max_pages {
                    tracing::warn!(
                        collection = %collection_url,
                        max_pages,
                        "collection page bound reached, truncating enumeration"
                    );
                    break;
                }
                pages_fetched += 1;
                match get_json(http_client, &url, ACTIVITY_JSON, "collection").await {
                    Ok(document) => document,
                    Err(error) => {
                        tracing::warn!(
                            page = %url,
                            %error,
                            "collection page fetch failed, stopping pagination"
                        );
                        break;
                    }
                }
            }
        };

        members.extend(extract_member_ids(&document));
        next = page_ref(document.get("next"));
    }

    Ok(members)
}

enum PageRef {
    Url(String),
    Embedded(serde_json::Value),
}

/// A `first`/`next` reference: either a page URL or an embedded page object.
fn page_ref(value: Option<&serde_json::Value>) -> Option<PageRef> {
    match value? {
        serde_json::Value::String(url) => Some(PageRef::Url(url.clone())),
        serde_json::Value::Object(map) => {
            if map.contains_key("orderedItems") || map.contains_key("items") {
                Some(PageRef::Embedded(serde_json::Value::Object(map.clone())))
            } else {
                map.get("id")
                    .and_then(|id| id.as_str())
                    .map(|id| PageRef::Url(id.to_string()))
            }
        }
        _ => None,
    }
}

/// Member IDs from a collection or page document, in document order.
///
/// Items may be bare ID strings or embedded objects carrying an `id`.
fn extract_member_ids(document: &serde_json::Value) -> Vec<String> {
    let items = document
        .get("orderedItems")
        .or_else(|| document.get("items"))
        .and_then(|items| items.as_array());

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Object(map) => map
                .get("id")
                .and_then(|id| id.as_str())
                .map(str::to_string),
            _ => None,
        })
        .collect()
}
