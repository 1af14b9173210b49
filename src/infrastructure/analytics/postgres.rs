use async_trait::async_trait;
use tracing::{info, warn};

use crate::infrastructure::db::pool::{self, DbPool};
use crate::modules::analytics::model::AnalyticsRecord;
use crate::modules::analytics::service::{AnalyticsBackend, AnalyticsError};

const CREATE_RENDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS renders (
    id UUID PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    duration_frames INTEGER NOT NULL,
    resolution TEXT,
    quality TEXT,
    user_hash TEXT NOT NULL,
    status TEXT NOT NULL
)
"#;

const INSERT_RENDER: &str = r#"
INSERT INTO renders (id, created_at, duration_frames, resolution, quality, user_hash, status)
VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

/// Inserts one row per finished job into the `renders` table.
pub struct PostgresAnalytics {
    pool: DbPool,
}

impl PostgresAnalytics {
    /// Fails only on a malformed URL. An unreachable server is logged and
    /// surfaces later as per-record insert errors.
    pub async fn connect(url: &str) -> Result<Self, AnalyticsError> {
        let pool = pool::connect_lazy(url)?;
        let analytics = Self { pool };

        match analytics.ensure_schema().await {
            Ok(()) => info!("Analytics: renders table ready"),
            Err(e) => warn!(error = %e, "Analytics: could not prepare renders table"),
        }

        Ok(analytics)
    }

    async fn ensure_schema(&self) -> Result<(), AnalyticsError> {
        sqlx::query(CREATE_RENDERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AnalyticsBackend for PostgresAnalytics {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, record: &AnalyticsRecord) -> Result<(), AnalyticsError> {
        sqlx::query(INSERT_RENDER)
            .bind(record.id)
            .bind(record.created_at)
            .bind(record.duration_frames)
            .bind(&record.resolution)
            .bind(&record.quality)
            .bind(&record.user_hash)
            .bind(record.status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
