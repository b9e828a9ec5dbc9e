//! WebFinger protocol client
//!
//! Used to discover ActivityPub actor URIs from `acct:` addresses, per the
//! `GET /.well-known/webfinger?resource=acct:<local>@<domain>` convention.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{JRD_JSON, get_json};
use crate::error::AppError;

/// WebFinger JRD response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerResponse {
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub links: Vec<WebFingerLink>,
}

/// WebFinger link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerLink {
    pub rel: String,
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// WebFinger discovery client.
///
/// Resolves `acct:` identifiers against remote domains. All failure modes
/// (unreachable host after the bounded retry, non-200 response, malformed
/// JRD, no matching link) surface as [`AppError::NotFound`]; callers never
/// see raw network errors.
pub struct WebFingerResolver {
    http_client: Arc<reqwest::Client>,
    /// Scheme for discovery URLs; https outside local development
    scheme: String,
}

impl WebFingerResolver {
    /// Create new WebFinger resolver
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self {
            http_client,
            scheme: "https".to_string(),
        }
    }

    /// Override the discovery URL scheme.
    ///
    /// Only meaningful for plain-HTTP development instances.
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Resolve an `acct` to the link describing the actor's canonical URL.
    ///
    /// # Arguments
    /// * `domain` - Remote domain to query
    /// * `acct` - Account address (`user@domain`, without the `acct:` prefix)
    ///
    /// # Errors
    /// [`AppError::NotFound`] if the account does not exist on the remote
    /// server or no ActivityPub self link is published for it.
    pub async fn resolve_acct(&self, domain: &str, acct: &str) -> Result<WebFingerLink, AppError> {
        let url = discovery_url(&self.scheme, domain, acct);
        let document = get_json(&self.http_client, &url, JRD_JSON, "webfinger").await?;

        let jrd: WebFingerResponse = serde_json::from_value(document)
            .map_err(|e| AppError::MalformedDocument(format!("JRD from {}: {}", domain, e)))?;

        match select_self_link(&jrd.links) {
            Some(link) => Ok(link.clone()),
            None => {
                tracing::debug!(%acct, %domain, "WebFinger response has no ActivityPub self link");
                Err(AppError::NotFound)
            }
        }
    }

    /// Resolve an `acct` directly to the actor URL.
    ///
    /// Used when the caller only needs the URL and will perform its own fetch.
    pub async fn resolve_acct_link(&self, domain: &str, acct: &str) -> Result<String, AppError> {
        let link = self.resolve_acct(domain, acct).await?;
        link.href.ok_or(AppError::NotFound)
    }
}

/// Build the well-known discovery URL for an acct on a domain.
fn discovery_url(scheme: &str, domain: &str, acct: &str) -> String {
    let resource = format!("acct:{}", acct);
    format!(
        "{}://{}/.well-known/webfinger?resource={}",
        scheme,
        domain,
        urlencoding::encode(&resource)
    )
}

/// Pick the link pointing at the actor's canonical ActivityPub representation.
///
/// Prefers `rel == "self"` with an ActivityPub media type; falls back to any
/// `self` link carrying an href.
fn select_self_link(links: &[WebFingerLink]) -> Option<&WebFingerLink> {
    links
        .iter()
        .find(|link| {
            link.rel == "self"
                && link
                    .link_type
                    .as_deref()
                    .map(is_activitypub_media_type)
                    .unwrap_or(false)
                && link.href.is_some()
        })
        .or_else(|| links.iter().find(|link| link.rel == "self" && link.href.is_some()))
}

fn is_activitypub_media_type(media_type: &str) -> bool {
    media_type == "application/activity+json"
        || (media_type.starts_with("application/ld+json")
            && media_type.contains("activitystreams"))
}
