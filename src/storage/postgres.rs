//! Postgres storage implementation.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::Result;
use crate::models::{BrandStats, DatabaseConfig, StoredStory, StoryRecord};
use crate::storage::{InsertOutcome, StoryRepository};
use crate::utils::redact_url;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Story repository backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and apply pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let target = redact_url(&config.url);
        log::info!("Connecting to PostgreSQL at {target}");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&config.url)
            .await
            .inspect_err(|e| log::error!("Failed to connect to PostgreSQL at {target}: {e}"))?;

        let repository = Self::new(pool);
        repository.migrate().await?;

        log::info!("Connected to PostgreSQL at {target}");
        Ok(repository)
    }

    /// Apply embedded migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .inspect_err(|e| log::error!("Failed to apply migrations: {e}"))?;
        log::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn insert_if_new(&self, story: &StoryRecord) -> Result<InsertOutcome> {
        let row = sqlx::query_as::<_, StoredStory>(
            r#"
            INSERT INTO stories (hn_id, title, author, url, time)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (hn_id) DO NOTHING
            RETURNING id, hn_id, title, author, url, time
            "#,
        )
        .bind(story.hn_id)
        .bind(&story.title)
        .bind(&story.author)
        .bind(&story.url)
        .bind(story.time)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(stored) => InsertOutcome::Inserted(stored),
            None => InsertOutcome::AlreadyExists,
        })
    }

    async fn brand_stats(&self) -> Result<Vec<BrandStats>> {
        let stats = sqlx::query_as::<_, BrandStats>(
            r#"
            SELECT brand, COUNT(*) AS mentions
            FROM brand_mentions
            GROUP BY brand
            ORDER BY mentions DESC, brand ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn stories_by_brand(&self, brand: &str) -> Result<Vec<StoredStory>> {
        log::debug!("Fetching stories for brand {brand:?}");

        // EXISTS rather than JOIN: several mentions of one brand in a story
        // must not duplicate the story.
        let stories = sqlx::query_as::<_, StoredStory>(
            r#"
            SELECT s.id, s.hn_id, s.title, s.author, s.url, s.time
            FROM stories s
            WHERE EXISTS (
                SELECT 1 FROM brand_mentions bm
                WHERE bm.hn_id = s.hn_id AND bm.brand = $1
            )
            ORDER BY s.time DESC, s.id DESC
            "#,
        )
        .bind(brand)
        .fetch_all(&self.pool)
        .await?;
        Ok(stories)
    }

    async fn close(&self) {
        log::info!("Closing PostgreSQL pool");
        self.pool.close().await;
    }
}
