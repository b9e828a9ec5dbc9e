//! Actor document fetching and validation
//!
//! Fetches ActivityPub actor documents and normalizes them into [`Actor`]
//! records. A document must carry an `id`, an `inbox`, and a `publicKey` to
//! be considered well-formed; everything else is optional.

use chrono::{DateTime, Utc};

use super::{ACTIVITY_JSON, get_json};
use crate::data::{Actor, PublicKey};
use crate::error::AppError;

/// Fetch an actor document
///
/// # Arguments
/// * `actor_url` - ActivityPub actor URL
/// * `http_client` - HTTP client
///
/// # Returns
/// Actor JSON document
pub async fn fetch_actor(
    actor_url: &str,
    http_client: &reqwest::Client,
) -> Result<serde_json::Value, AppError> {
    get_json(http_client, actor_url, ACTIVITY_JSON, "actor").await
}

/// Fetch and validate an actor in one step.
pub async fn fetch_and_parse_actor(
    actor_url: &str,
    http_client: &reqwest::Client,
) -> Result<Actor, AppError> {
    let document = fetch_actor(actor_url, http_client).await?;
    parse_actor(&document)
}

/// Extract a normalized [`Actor`] from an actor document.
///
/// # Errors
/// [`AppError::MalformedDocument`] if the document is missing `id`, `inbox`,
/// or a `publicKey` with PEM material, or if `id` is not an http(s) URL.
pub fn parse_actor(document: &serde_json::Value) -> Result<Actor, AppError> {
    let id = require_str(document, "id")?;
    let parsed = url::Url::parse(id)
        .map_err(|_| AppError::MalformedDocument(format!("actor id is not a URL: {}", id)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::MalformedDocument(format!(
            "actor id has unsupported scheme: {}",
            id
        )));
    }

    let inbox = require_str(document, "inbox")?;
    let public_key = parse_public_key(document, id)?;

    Ok(Actor {
        id: id.to_string(),
        preferred_username: optional_str(document, "preferredUsername"),
        display_name: optional_str(document, "name"),
        summary: optional_str(document, "summary"),
        inbox: inbox.to_string(),
        outbox: optional_str(document, "outbox"),
        followers: optional_str(document, "followers"),
        following: optional_str(document, "following"),
        public_key,
        avatar_url: image_url(document.get("icon")),
        header_url: image_url(document.get("image")),
        profile_url: optional_str(document, "url"),
        published: optional_str(document, "published")
            .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
            .map(|parsed| parsed.with_timezone(&Utc)),
    })
}

fn parse_public_key(document: &serde_json::Value, actor_id: &str) -> Result<PublicKey, AppError> {
    let key = document
        .get("publicKey")
        .ok_or_else(|| AppError::MalformedDocument(format!("actor {} has no publicKey", actor_id)))?;

    let pem = key
        .get("publicKeyPem")
        .and_then(|value| value.as_str())
        .ok_or_else(|| {
            AppError::MalformedDocument(format!("actor {} publicKey has no PEM material", actor_id))
        })?;

    let key_id = key
        .get("id")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}#main-key", actor_id));

    Ok(PublicKey {
        id: key_id,
        owner: key
            .get("owner")
            .and_then(|value| value.as_str())
            .map(str::to_string),
        pem: pem.to_string(),
    })
}

fn require_str<'a>(document: &'a serde_json::Value, field: &str) -> Result<&'a str, AppError> {
    document
        .get(field)
        .and_then(|value| value.as_str())
        .ok_or_else(|| AppError::MalformedDocument(format!("actor document has no {}", field)))
}

fn optional_str(document: &serde_json::Value, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

/// Media URL from an `icon`/`image` property, which may be a bare string or
/// an Image object.
fn image_url(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(url) => Some(url.clone()),
        serde_json::Value::Object(map) => map
            .get("url")
            .and_then(|url| url.as_str())
            .map(str::to_string),
        _ => None,
    }
}
