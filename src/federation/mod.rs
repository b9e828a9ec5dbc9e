//! Remote resolution protocol clients
//!
//! Handles:
//! - WebFinger discovery
//! - Actor document fetching and validation
//! - Followers collection pagination

mod actor;
mod collection;
mod webfinger;

pub use actor::{fetch_actor, fetch_and_parse_actor, parse_actor};
pub use collection::fetch_collection_members;
pub use webfinger::{WebFingerLink, WebFingerResolver, WebFingerResponse};

use crate::error::AppError;
use crate::metrics::{FEDERATION_REQUEST_DURATION_SECONDS, FEDERATION_REQUESTS_TOTAL};

pub(crate) const ACTIVITY_JSON: &str = "application/activity+json";
pub(crate) const JRD_JSON: &str = "application/jrd+json";

/// Fetch a JSON document from a remote server.
///
/// Applies the shared failure taxonomy: connect/timeout problems are
/// transient ([`AppError::Upstream`]) and get one bounded retry; a definitive
/// 404/410 (and other client errors) is [`AppError::NotFound`]; an unparsable
/// body is [`AppError::MalformedDocument`].
///
/// # Arguments
/// * `kind` - Request kind label for metrics ("webfinger", "actor", "collection")
pub(crate) async fn get_json(
    http_client: &reqwest::Client,
    url: &str,
    accept: &str,
    kind: &str,
) -> Result<serde_json::Value, AppError> {
    let timer = FEDERATION_REQUEST_DURATION_SECONDS
        .with_label_values(&[kind])
        .start_timer();

    let mut result = get_json_once(http_client, url, accept).await;
    if let Err(AppError::Upstream(reason)) = &result {
        tracing::debug!(url = %url, %reason, "transient fetch failure, retrying once");
        result = get_json_once(http_client, url, accept).await;
    }

    timer.observe_duration();

    let status = match &result {
        Ok(_) => "ok",
        Err(AppError::NotFound) => "not_found",
        Err(AppError::Upstream(_)) => "upstream",
        Err(AppError::MalformedDocument(_)) => "malformed",
        Err(_) => "error",
    };
    FEDERATION_REQUESTS_TOTAL
        .with_label_values(&[kind, status])
        .inc();

    result
}

async fn get_json_once(
    http_client: &reqwest::Client,
    url: &str,
    accept: &str,
) -> Result<serde_json::Value, AppError> {
    let response = http_client
        .get(url)
        .header(reqwest::header::ACCEPT, accept)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("failed to reach {}: {}", url, e)))?;

    let status = response.status();
    if status.is_success() {
        return response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AppError::MalformedDocument(format!("{}: {}", url, e)));
    }

    if status.is_server_error() {
        return Err(AppError::Upstream(format!("{} returned HTTP {}", url, status)));
    }

    // Client errors (404, 410, ...) are a definitive absence
    Err(AppError::NotFound)
}
