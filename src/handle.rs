//! Account identifier parsing
//!
//! Turns raw identifiers (`alice`, `alice@example.com`, `@alice@example.com`,
//! `acct:alice@example.com`, or a full actor URL) into a structured [`Handle`].
//! Parsing never performs I/O; every other resolution component builds on it.

use url::Url;

use crate::error::AppError;

/// A parsed account identifier.
///
/// `domain == None` means the handle refers to this server's own domain;
/// which domain that is gets decided by the caller's request context, never
/// hard-coded here. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub local_part: String,
    pub domain: Option<String>,
}

impl Handle {
    /// Parse a raw identifier into a handle.
    ///
    /// Accepted forms:
    /// - `alice` (bare local name)
    /// - `alice@example.com`, `@alice@example.com`, `acct:alice@example.com`
    /// - `https://example.com/users/alice` (actor URL)
    ///
    /// Percent-encoded input is decoded first; domains are lowercased.
    ///
    /// # Errors
    /// Returns [`AppError::Unparsable`] on malformed input. Callers treat
    /// unparsable identifiers as "not found".
    pub fn parse(identifier: &str) -> Result<Self, AppError> {
        let decoded = urlencoding::decode(identifier.trim())
            .map_err(|_| AppError::Unparsable(identifier.to_string()))?;
        let raw = decoded.trim();

        if raw.is_empty() {
            return Err(AppError::Unparsable(identifier.to_string()));
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url =
                Url::parse(raw).map_err(|_| AppError::Unparsable(identifier.to_string()))?;
            return url_to_handle(&url);
        }

        let raw = raw.strip_prefix("acct:").unwrap_or(raw);
        let raw = raw.strip_prefix('@').unwrap_or(raw);

        let mut parts = raw.split('@');
        let local_part = parts.next().unwrap_or_default();
        let domain = parts.next();
        if parts.next().is_some() {
            return Err(AppError::Unparsable(identifier.to_string()));
        }

        if !is_valid_local_part(local_part) {
            return Err(AppError::Unparsable(identifier.to_string()));
        }

        let domain = match domain {
            Some(domain) => {
                if !is_valid_domain(domain) {
                    return Err(AppError::Unparsable(identifier.to_string()));
                }
                Some(domain.to_ascii_lowercase())
            }
            None => None,
        };

        Ok(Handle {
            local_part: local_part.to_string(),
            domain,
        })
    }

    /// The `acct` form of this handle: `alice` for a handle with no domain,
    /// `alice@example.com` otherwise.
    pub fn acct(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{}", self.local_part, domain),
            None => self.local_part.clone(),
        }
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.acct())
    }
}

/// Extract a handle from an actor URL.
///
/// The local part is the last path segment (a leading `@` in profile-page
/// style paths is stripped); the domain is the URL host, lowercased, with an
/// explicit port preserved.
pub fn url_to_handle(url: &Url) -> Result<Handle, AppError> {
    let mut host = url
        .host_str()
        .ok_or_else(|| AppError::Unparsable(url.to_string()))?
        .to_ascii_lowercase();
    if let Some(port) = url.port() {
        host = format!("{}:{}", host, port);
    }

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let local_part = segment.strip_prefix('@').unwrap_or(segment);

    if !is_valid_local_part(local_part) {
        return Err(AppError::Unparsable(url.to_string()));
    }

    Ok(Handle {
        local_part: local_part.to_string(),
        domain: Some(host),
    })
}

/// Build the canonical actor URL for a local account.
pub fn canonical_actor_url(domain: &str, local_part: &str) -> String {
    format!(
        "https://{}/users/{}",
        domain.to_ascii_lowercase(),
        local_part
    )
}

fn is_valid_local_part(local_part: &str) -> bool {
    !local_part.is_empty()
        && local_part
            .chars()
            .all(|c| !c.is_whitespace() && c != '@' && c != '/' && c != ':')
}

fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain
            .chars()
            .all(|c| !c.is_whitespace() && c != '@' && c != '/')
}
