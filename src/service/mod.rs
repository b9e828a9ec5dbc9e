//! Resolution services
//!
//! - `account`: identifier -> account view resolution
//! - `followers`: follower list aggregation
//!
//! Both services branch on the same local/remote classification, computed
//! exactly once per request.

mod account;
mod followers;

pub use account::{AccountService, IdentifierKind};
pub use followers::FollowerService;

use crate::error::AppError;
use crate::handle::Handle;

/// Where an identity is hosted, decided once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Hosted on this server; resolve through the local identity store
    Local(Handle),
    /// Hosted elsewhere; resolve via WebFinger + actor fetch
    Remote(Handle),
}

/// Classify a handle against the request's own domain.
///
/// A missing domain means "this server"; a matching domain (case-insensitive
/// host comparison) is equally local. Everything else is remote.
pub fn classify(request_domain: &str, handle: Handle) -> Identity {
    match &handle.domain {
        None => Identity::Local(handle),
        Some(domain) if domain.eq_ignore_ascii_case(request_domain) => Identity::Local(handle),
        Some(_) => Identity::Remote(handle),
    }
}

/// Collapse remote-resolution failures to `NotFound` at the service boundary.
///
/// Raw network errors never cross into callers; infrastructure errors (local
/// store, configuration) pass through untouched.
pub(crate) fn collapse_remote_error(error: AppError) -> AppError {
    if error.is_remote_failure() {
        if !matches!(error, AppError::NotFound) {
            tracing::debug!(%error, "remote resolution failure collapsed to not found");
        }
        AppError::NotFound
    } else {
        error
    }
}
