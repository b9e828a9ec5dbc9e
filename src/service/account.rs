//! Account resolution service
//!
//! Turns any supported identifier (canonical handle/URL, opaque Mastodon-style
//! ID, or private contact email) into a normalized [`AccountView`].

use std::sync::Arc;

use super::{Identity, classify, collapse_remote_error};
use crate::data::{AccountView, ActorCache, IdentityStore};
use crate::error::AppError;
use crate::federation::WebFingerResolver;
use crate::handle::{Handle, canonical_actor_url};
use crate::metrics::ACCOUNT_RESOLUTIONS_TOTAL;

/// What kind of identifier the caller holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// A public identifier: bare name, `user@domain`, or actor URL
    Canonical,
    /// The opaque Mastodon-style ID of a locally-hosted account
    Opaque,
}

/// Account resolution service
pub struct AccountService {
    store: Arc<dyn IdentityStore>,
    webfinger: Arc<WebFingerResolver>,
    actors: Arc<ActorCache>,
}

impl AccountService {
    /// Create new account service
    pub fn new(
        store: Arc<dyn IdentityStore>,
        webfinger: Arc<WebFingerResolver>,
        actors: Arc<ActorCache>,
    ) -> Self {
        Self {
            store,
            webfinger,
            actors,
        }
    }

    /// Resolve an identifier to an account view.
    ///
    /// Local identities are read from the identity store only; remote
    /// identities go through WebFinger discovery and the shared actor cache.
    ///
    /// # Arguments
    /// * `request_domain` - The domain this request considers its own
    /// * `identifier` - The identifier to resolve
    /// * `kind` - Whether `identifier` is public or an opaque local ID
    ///
    /// # Errors
    /// [`AppError::NotFound`] for unknown identities and for every
    /// remote-resolution failure mode; store errors propagate.
    pub async fn resolve_account(
        &self,
        request_domain: &str,
        identifier: &str,
        kind: IdentifierKind,
    ) -> Result<AccountView, AppError> {
        let canonical = match kind {
            IdentifierKind::Canonical => identifier.to_string(),
            IdentifierKind::Opaque => {
                match self.store.map_opaque_id_to_canonical_id(identifier).await {
                    Ok(Some(canonical)) => canonical,
                    Ok(None) => {
                        tracing::debug!(%identifier, "opaque ID has no canonical mapping");
                        return Err(AppError::NotFound);
                    }
                    Err(error) => {
                        tracing::debug!(%error, "opaque ID mapping failed, treating as not found");
                        return Err(AppError::NotFound);
                    }
                }
            }
        };

        let handle = match Handle::parse(&canonical) {
            Ok(handle) => handle,
            Err(error) => {
                tracing::debug!(identifier = %canonical, %error, "unparsable identifier");
                return Err(AppError::NotFound);
            }
        };

        let (path, result) = match classify(request_domain, handle) {
            Identity::Local(handle) => {
                ("local", self.resolve_local(request_domain, &handle).await)
            }
            Identity::Remote(handle) => ("remote", self.resolve_remote(&handle).await),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AppError::NotFound) => "not_found",
            Err(_) => "error",
        };
        ACCOUNT_RESOLUTIONS_TOTAL
            .with_label_values(&[path, outcome])
            .inc();

        result
    }

    /// Resolve an account by its private contact email.
    ///
    /// Tolerates "address has no associated account" (and any storage fault on
    /// the address mapping) by yielding `NotFound` rather than an error.
    pub async fn resolve_account_by_email(
        &self,
        request_domain: &str,
        email: &str,
    ) -> Result<AccountView, AppError> {
        let canonical = match self.store.map_email_to_canonical_id(email).await {
            Ok(Some(canonical)) => canonical,
            Ok(None) => return Err(AppError::NotFound),
            Err(error) => {
                tracing::debug!(%error, "email mapping failed, treating as not found");
                return Err(AppError::NotFound);
            }
        };

        self.resolve_account(request_domain, &canonical, IdentifierKind::Canonical)
            .await
    }

    async fn resolve_local(
        &self,
        request_domain: &str,
        handle: &Handle,
    ) -> Result<AccountView, AppError> {
        let actor_url = canonical_actor_url(request_domain, &handle.local_part);
        let actor = self
            .store
            .lookup_actor_by_url(&actor_url)
            .await?
            .ok_or(AppError::NotFound)?;

        let opaque_id = self
            .store
            .opaque_id_for_actor(&actor_url)
            .await?
            .unwrap_or_else(|| actor.id.clone());

        Ok(AccountView::local(&opaque_id, &actor))
    }

    async fn resolve_remote(&self, handle: &Handle) -> Result<AccountView, AppError> {
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

        Ok(AccountView::remote(&acct, &actor))
    }
}
