//! Muster - Federated identity and follower resolution for
//! Mastodon-compatible servers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                           │
//! │  - Account resolution (local store vs. WebFinger path)      │
//! │  - Follower aggregation (edge list vs. remote collection)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │       Data Layer         │   │      Federation Layer        │
//! │  - SQLite identity store │   │  - WebFinger discovery       │
//! │  - Actor cache (TTL)     │   │  - Actor fetch/validation    │
//! └──────────────────────────┘   │  - Collection pagination     │
//!                                └──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `service`: Account resolution and follower aggregation
//! - `federation`: WebFinger, actor, and collection protocol clients
//! - `data`: Identity store, actor cache, and models
//! - `handle`: Identifier parsing
//! - `config`: Configuration management
//! - `error`: Error types

pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod handle;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all requests
///
/// Holds the resources every resolution needs: database pool, the shared
/// actor cache, and the HTTP client used for all outbound federation.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// SQLite identity store
    pub db: Arc<data::Database>,

    /// Shared actor cache (volatile)
    pub actors: Arc<data::ActorCache>,

    /// WebFinger discovery client
    pub webfinger: Arc<federation::WebFingerResolver>,

    /// HTTP client for federation
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to the SQLite identity store
    /// 2. Build the shared HTTP client
    /// 3. Initialize the actor cache
    /// 4. Build the WebFinger resolver
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite identity store
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Identity store connected");

        // 2. Build HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent(&config.federation.user_agent)
            .timeout(config.federation.request_timeout())
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let http_client = Arc::new(http_client);

        // 3. Initialize actor cache
        let actors = data::ActorCache::new(http_client.clone(), Some(config.cache.actor_ttl()));

        // 4. Build WebFinger resolver
        let webfinger = federation::WebFingerResolver::new(http_client.clone())
            .with_scheme(&config.server.protocol);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            actors: Arc::new(actors),
            webfinger: Arc::new(webfinger),
            http_client,
        })
    }

    /// Build an account resolution service over this state.
    pub fn account_service(&self) -> service::AccountService {
        service::AccountService::new(
            self.db.clone(),
            self.webfinger.clone(),
            self.actors.clone(),
        )
    }

    /// Build a follower aggregation service over this state.
    pub fn follower_service(&self) -> service::FollowerService {
        service::FollowerService::new(
            self.db.clone(),
            self.webfinger.clone(),
            self.actors.clone(),
            self.http_client.clone(),
            &self.config.federation,
        )
    }
}
