//! Follower aggregation service
//!
//! Produces a followee's full follower list regardless of whether the followee
//! or its followers are local or remote. Member resolution is best-effort: a
//! single unreachable follower is dropped, never fatal.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::{Identity, classify, collapse_remote_error};
use crate::config::FederationConfig;
use crate::data::{AccountView, ActorCache, IdentityStore};
use crate::error::AppError;
use crate::federation::{WebFingerResolver, fetch_collection_members};
use crate::handle::{Handle, url_to_handle};
use crate::metrics::FOLLOWERS_DROPPED_TOTAL;

/// Follower aggregation service
pub struct FollowerService {
    store: Arc<dyn IdentityStore>,
    webfinger: Arc<WebFingerResolver>,
    actors: Arc<ActorCache>,
    http_client: Arc<reqwest::Client>,
    /// Maximum in-flight member resolutions
    max_concurrent: usize,
    /// Page bound when walking a remote followers collection
    max_pages: usize,
}

impl FollowerService {
    /// Create new follower service
    pub fn new(
        store: Arc<dyn IdentityStore>,
        webfinger: Arc<WebFingerResolver>,
        actors: Arc<ActorCache>,
        http_client: Arc<reqwest::Client>,
        federation: &FederationConfig,
    ) -> Self {
        Self {
            store,
            webfinger,
            actors,
            http_client,
            max_concurrent: federation.max_concurrent_fetches.max(1),
            max_pages: federation.max_collection_pages,
        }
    }

    /// Resolve a followee's follower list.
    ///
    /// The result preserves source enumeration order: local store order for
    /// local followees, collection page order for remote ones. Individual
    /// member failures are logged and omitted.
    ///
    /// # Errors
    /// [`AppError::NotFound`] only when the owning identity itself cannot be
    /// resolved (unknown local account, failed WebFinger/actor resolution, or
    /// unreachable collection root).
    pub async fn get_followers(
        &self,
        request_domain: &str,
        identifier: &str,
    ) -> Result<Vec<AccountView>, AppError> {
        let handle = match Handle::parse(identifier) {
            Ok(handle) => handle,
            Err(error) => {
                tracing::debug!(%identifier, %error, "unparsable identifier");
                return Err(AppError::NotFound);
            }
        };

        match classify(request_domain, handle) {
            Identity::Local(handle) => self.local_followers(request_domain, &handle).await,
            Identity::Remote(handle) => self.remote_followers(&handle).await,
        }
    }

    /// Followers of a locally-hosted followee, from the durable edge list.
    async fn local_followers(
        &self,
        request_domain: &str,
        handle: &Handle,
    ) -> Result<Vec<AccountView>, AppError> {
        let actor = self
            .store
            .lookup_actor_by_local_part(request_domain, &handle.local_part)
            .await?
            .ok_or(AppError::NotFound)?;

        let follower_urls = self.store.get_follower_urls(&actor).await?;

        tracing::debug!(
            followee = %actor.id,
            followers = follower_urls.len(),
            "aggregating local follower list"
        );

        Ok(self.resolve_members(follower_urls).await)
    }

    /// Followers of a remote followee, re-derived from its published
    /// collection on every request.
    async fn remote_followers(&self, handle: &Handle) -> Result<Vec<AccountView>, AppError> {
        let Some(domain) = handle.domain.as_deref() else {
            return Err(AppError::NotFound);
        };
        let acct = handle.acct();

        let link = self
            .webfinger
            .resolve_acct_link(domain, &acct)
            .await
            .map_err(collapse_remote_error)?;

        let actor = self
            .actors
            .get_and_cache(&link)
            .await
            .map_err(collapse_remote_error)?;

        let Some(followers_url) = actor.followers.clone() else {
            tracing::debug!(actor = %actor.id, "actor publishes no followers collection");
            return Ok(Vec::new());
        };

        let member_ids =
            fetch_collection_members(&self.http_client, &followers_url, self.max_pages)
                .await
                .map_err(collapse_remote_error)?;

        tracing::debug!(
            followee = %actor.id,
            followers = member_ids.len(),
            "aggregating remote follower list"
        );

        Ok(self.resolve_members(member_ids).await)
    }

    /// Resolve member actor URLs to account views.
    ///
    /// Resolutions run concurrently up to `max_concurrent`, but the output is
    /// joined back into enumeration order, not completion order. Failures
    /// resolve to `None` and are folded out.
    async fn resolve_members(&self, member_urls: Vec<String>) -> Vec<AccountView> {
        stream::iter(member_urls.into_iter().map(|url| self.resolve_member(url)))
            .buffered(self.max_concurrent)
            .filter_map(|view| async move { view })
            .collect()
            .await
    }

    async fn resolve_member(&self, member_url: String) -> Option<AccountView> {
        let actor = match self.actors.get_and_cache(&member_url).await {
            Ok(actor) => actor,
            Err(error) => {
                tracing::warn!(
                    follower = %member_url,
                    %error,
                    "failed to resolve follower, omitting from result"
                );
                FOLLOWERS_DROPPED_TOTAL.inc();
                return None;
            }
        };

        let handle = actor.handle().or_else(|| {
            url::Url::parse(&member_url)
                .ok()
                .and_then(|url| url_to_handle(&url).ok())
        });
        let Some(handle) = handle else {
            tracing::warn!(
                follower = %member_url,
                "resolved follower has no derivable handle, omitting from result"
            );
            FOLLOWERS_DROPPED_TOTAL.inc();
            return None;
        };

        Some(AccountView::remote(&handle.acct(), &actor))
    }
}
