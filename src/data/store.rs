//! Local identity store contract
//!
//! The authoritative source for actors hosted on this server. The store owns
//! no resolution logic beyond lookup; resolution services depend on this trait
//! and never on a concrete database.

use async_trait::async_trait;

use crate::data::models::Actor;
use crate::error::AppError;

/// Lookup contract over locally-hosted account/actor records.
///
/// All operations are reads. "Does not exist" is `Ok(None)`; `Err` is reserved
/// for infrastructure failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Load a local actor by its canonical actor URL.
    async fn lookup_actor_by_url(&self, url: &str) -> Result<Option<Actor>, AppError>;

    /// Load a local actor by domain and local part.
    async fn lookup_actor_by_local_part(
        &self,
        domain: &str,
        local_part: &str,
    ) -> Result<Option<Actor>, AppError>;

    /// Translate an opaque Mastodon-style ID to the canonical actor URL.
    async fn map_opaque_id_to_canonical_id(&self, id: &str) -> Result<Option<String>, AppError>;

    /// Translate a private contact email to the canonical actor URL.
    async fn map_email_to_canonical_id(&self, email: &str) -> Result<Option<String>, AppError>;

    /// Reverse mapping: the opaque Mastodon-style ID for a local actor URL.
    async fn opaque_id_for_actor(&self, actor_url: &str) -> Result<Option<String>, AppError>;

    /// Follower actor URLs for a local followee, in store iteration order.
    async fn get_follower_urls(&self, actor: &Actor) -> Result<Vec<String>, AppError>;
}
