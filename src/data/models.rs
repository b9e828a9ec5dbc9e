//! Data models
//!
//! The normalized [`Actor`] record shared by the local store and the remote
//! actor cache, and the Mastodon-API-shaped [`AccountView`] projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::handle::{Handle, url_to_handle};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Used for the opaque Mastodon-style IDs of locally-hosted accounts.
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Actor public key reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Key URL (actor#main-key)
    pub id: String,
    /// Owning actor URL
    pub owner: Option<String>,
    /// PEM-encoded public key, carried as opaque data
    pub pem: String,
}

/// Normalized identity record, local or remote.
///
/// Locally-hosted actors are owned by the identity store. Remote actors are
/// transient: owned by the actor cache, re-fetchable and replaceable at any
/// time, with no durability guarantee beyond the cache TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Canonical ActivityPub actor URL
    pub id: String,
    pub preferred_username: Option<String>,
    pub display_name: Option<String>,
    pub summary: Option<String>,
    /// Inbox URI for activity delivery
    pub inbox: String,
    /// Outbox URI for fetching posts
    pub outbox: Option<String>,
    /// Followers collection URL
    pub followers: Option<String>,
    /// Following collection URL
    pub following: Option<String>,
    pub public_key: PublicKey,
    pub avatar_url: Option<String>,
    pub header_url: Option<String>,
    /// Profile page URL (falls back to `id` when absent)
    pub profile_url: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl Actor {
    /// Best-effort username: `preferredUsername`, or the local part of the
    /// actor URL.
    pub fn username(&self) -> String {
        if let Some(username) = &self.preferred_username {
            return username.clone();
        }
        url::Url::parse(&self.id)
            .ok()
            .and_then(|url| url_to_handle(&url).ok())
            .map(|handle| handle.local_part)
            .unwrap_or_default()
    }

    /// The `user@domain` handle derived from the actor URL.
    pub fn handle(&self) -> Option<Handle> {
        let url = url::Url::parse(&self.id).ok()?;
        url_to_handle(&url).ok()
    }
}

// =============================================================================
// Account view (Mastodon API compatible)
// =============================================================================

/// Externally-exposed projection of an [`Actor`].
///
/// Derived, never mutated in place; recomputed from the underlying actor on
/// each resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub display_name: String,
    pub locked: bool,
    pub bot: bool,
    pub discoverable: bool,
    pub group: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub note: String,
    pub url: String,
    pub avatar: Option<String>,
    pub header: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub statuses_count: i64,
}

impl AccountView {
    /// Project a locally-hosted actor.
    ///
    /// `opaque_id` is the store's Mastodon-style ID; `acct` has no domain
    /// suffix for local accounts.
    pub fn local(opaque_id: &str, actor: &Actor) -> Self {
        let username = actor.username();
        Self::project(opaque_id.to_string(), username.clone(), username, actor)
    }

    /// Project a remote actor under its `user@domain` acct.
    ///
    /// Remote actors are never persisted, so no local ID exists for them; the
    /// acct form doubles as the ID.
    pub fn remote(acct: &str, actor: &Actor) -> Self {
        Self::project(acct.to_string(), actor.username(), acct.to_string(), actor)
    }

    fn project(id: String, username: String, acct: String, actor: &Actor) -> Self {
        let display_name = actor
            .display_name
            .clone()
            .unwrap_or_else(|| username.clone());

        Self {
            id,
            username,
            acct,
            display_name,
            locked: false,
            bot: false,
            discoverable: true,
            group: false,
            created_at: actor.published,
            note: actor.summary.clone().unwrap_or_default(),
            url: actor.profile_url.clone().unwrap_or_else(|| actor.id.clone()),
            avatar: actor.avatar_url.clone(),
            header: actor.header_url.clone(),
            followers_count: 0,
            following_count: 0,
            statuses_count: 0,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_actor(id: &str, username: &str) -> Actor {
    Actor {
        id: id.to_string(),
        preferred_username: Some(username.to_string()),
        display_name: None,
        summary: None,
        inbox: format!("{}/inbox", id),
        outbox: Some(format!("{}/outbox", id)),
        followers: Some(format!("{}/followers", id)),
        following: None,
        public_key: PublicKey {
            id: format!("{}#main-key", id),
            owner: Some(id.to_string()),
            pem: "-----BEGIN PUBLIC KEY-----\ntest\n-----END PUBLIC KEY-----".to_string(),
        },
        avatar_url: None,
        header_url: None,
        profile_url: None,
        published: None,
    }
}
