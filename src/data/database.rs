//! SQLite identity store
//!
//! All local actor persistence goes through this module. Implements
//! [`IdentityStore`] on top of a SQLite connection pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::{Actor, EntityId, PublicKey};
use super::store::IdentityStore;
use crate::error::AppError;
use crate::handle::canonical_actor_url;
use crate::metrics::DB_QUERIES_TOTAL;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Input for seeding a locally-hosted actor.
#[derive(Debug, Clone)]
pub struct NewLocalActor {
    pub username: String,
    pub domain: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub note: Option<String>,
    pub public_key_pem: String,
}

/// Row shape for the `actors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ActorRecord {
    id: String,
    mastodon_id: String,
    username: String,
    domain: String,
    email: Option<String>,
    display_name: Option<String>,
    note: Option<String>,
    avatar_url: Option<String>,
    header_url: Option<String>,
    inbox_url: String,
    outbox_url: Option<String>,
    followers_url: Option<String>,
    following_url: Option<String>,
    public_key_pem: String,
    created_at: DateTime<Utc>,
}

impl ActorRecord {
    fn into_actor(self) -> Actor {
        Actor {
            public_key: PublicKey {
                id: format!("{}#main-key", self.id),
                owner: Some(self.id.clone()),
                pem: self.public_key_pem,
            },
            preferred_username: Some(self.username),
            display_name: self.display_name,
            summary: self.note,
            inbox: self.inbox_url,
            outbox: self.outbox_url,
            followers: self.followers_url,
            following: self.following_url,
            avatar_url: self.avatar_url,
            header_url: self.header_url,
            profile_url: None,
            published: Some(self.created_at),
            id: self.id,
        }
    }
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist and runs pending
    /// migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
        })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Create a locally-hosted actor.
    ///
    /// The canonical actor URL, inbox/outbox/collection URLs, and the opaque
    /// Mastodon-style ID are derived here.
    ///
    /// # Errors
    /// Returns error if an actor with the same username/domain already exists
    pub async fn create_local_actor(&self, new: &NewLocalActor) -> Result<Actor, AppError> {
        let username = new.username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username cannot be empty".to_string()));
        }
        let domain = new.domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(AppError::Validation("domain cannot be empty".to_string()));
        }

        let id = canonical_actor_url(&domain, username);
        let record = ActorRecord {
            id: id.clone(),
            mastodon_id: EntityId::new().0,
            username: username.to_string(),
            domain,
            email: new.email.clone(),
            display_name: new.display_name.clone(),
            note: new.note.clone(),
            avatar_url: None,
            header_url: None,
            inbox_url: format!("{}/inbox", id),
            outbox_url: Some(format!("{}/outbox", id)),
            followers_url: Some(format!("{}/followers", id)),
            following_url: Some(format!("{}/following", id)),
            public_key_pem: new.public_key_pem.clone(),
            created_at: Utc::now(),
        };

        DB_QUERIES_TOTAL
            .with_label_values(&["insert", "actors"])
            .inc();
        sqlx::query(
            r#"
            INSERT INTO actors (
                id, mastodon_id, username, domain, email, display_name, note,
                avatar_url, header_url, inbox_url, outbox_url, followers_url,
                following_url, public_key_pem, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.mastodon_id)
        .bind(&record.username)
        .bind(&record.domain)
        .bind(&record.email)
        .bind(&record.display_name)
        .bind(&record.note)
        .bind(&record.avatar_url)
        .bind(&record.header_url)
        .bind(&record.inbox_url)
        .bind(&record.outbox_url)
        .bind(&record.followers_url)
        .bind(&record.following_url)
        .bind(&record.public_key_pem)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record.into_actor())
    }

    /// Record a follower edge for a local followee.
    ///
    /// Edges keep insertion order; re-adding an existing edge is a no-op.
    pub async fn add_follower(&self, actor_url: &str, follower_url: &str) -> Result<(), AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["insert", "actor_followers"])
            .inc();
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO actor_followers (actor_id, follower_url, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(actor_url)
        .bind(follower_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a follower edge.
    pub async fn remove_follower(
        &self,
        actor_url: &str,
        follower_url: &str,
    ) -> Result<(), AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["delete", "actor_followers"])
            .inc();
        sqlx::query("DELETE FROM actor_followers WHERE actor_id = ? AND follower_url = ?")
            .bind(actor_url)
            .bind(follower_url)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl IdentityStore for Database {
    async fn lookup_actor_by_url(&self, url: &str) -> Result<Option<Actor>, AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["select", "actors"])
            .inc();
        let record = sqlx::query_as::<_, ActorRecord>("SELECT * FROM actors WHERE id = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(ActorRecord::into_actor))
    }

    async fn lookup_actor_by_local_part(
        &self,
        domain: &str,
        local_part: &str,
    ) -> Result<Option<Actor>, AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["select", "actors"])
            .inc();
        let record = sqlx::query_as::<_, ActorRecord>(
            "SELECT * FROM actors WHERE domain = ? AND username = ?",
        )
        .bind(domain.to_ascii_lowercase())
        .bind(local_part)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ActorRecord::into_actor))
    }

    async fn map_opaque_id_to_canonical_id(&self, id: &str) -> Result<Option<String>, AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["select", "actors"])
            .inc();
        let row = sqlx::query_as::<_, (String,)>("SELECT id FROM actors WHERE mastodon_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn map_email_to_canonical_id(&self, email: &str) -> Result<Option<String>, AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["select", "actors"])
            .inc();
        let row = sqlx::query_as::<_, (String,)>("SELECT id FROM actors WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn opaque_id_for_actor(&self, actor_url: &str) -> Result<Option<String>, AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["select", "actors"])
            .inc();
        let row = sqlx::query_as::<_, (String,)>("SELECT mastodon_id FROM actors WHERE id = ?")
            .bind(actor_url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(mastodon_id,)| mastodon_id))
    }

    async fn get_follower_urls(&self, actor: &Actor) -> Result<Vec<String>, AppError> {
        DB_QUERIES_TOTAL
            .with_label_values(&["select", "actor_followers"])
            .inc();
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT follower_url FROM actor_followers WHERE actor_id = ? ORDER BY id",
        )
        .bind(&actor.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}
