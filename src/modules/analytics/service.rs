use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::model::AnalyticsRecord;
use crate::config::settings::AppConfig;
use crate::infrastructure::analytics::{LocalLogAnalytics, PostgresAnalytics};
use crate::modules::render::model::Job;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait AnalyticsBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn insert(&self, record: &AnalyticsRecord) -> Result<(), AnalyticsError>;
}

/// Write-only reporting of finished jobs. Failures are logged and dropped.
#[derive(Clone)]
pub struct AnalyticsSink {
    backend: Arc<dyn AnalyticsBackend>,
}

impl AnalyticsSink {
    pub fn new(backend: Arc<dyn AnalyticsBackend>) -> Self {
        Self { backend }
    }

    /// Remote store when a database URL is configured, local log otherwise.
    pub async fn from_config(config: &AppConfig) -> Self {
        if let Some(url) = &config.analytics_database_url {
            match PostgresAnalytics::connect(url).await {
                Ok(remote) => {
                    info!("Analytics: remote store enabled");
                    return Self::new(Arc::new(remote));
                }
                Err(e) => {
                    error!(error = %e, "Analytics: invalid remote store URL, using local log");
                }
            }
        } else {
            info!("Analytics: no remote store configured, using local log");
        }

        Self::new(Arc::new(LocalLogAnalytics::new(&config.analytics_data_dir).await))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn record(&self, job: &Job) {
        let record = AnalyticsRecord::from_job(job);
        match self.backend.insert(&record).await {
            Ok(()) => info!(
                job_id = %record.id,
                backend = self.backend.name(),
                "Analytics: logged job"
            ),
            Err(e) => error!(
                job_id = %record.id,
                backend = self.backend.name(),
                error = %e,
                "Analytics error"
            ),
        }
    }

    /// Records on a separate task so a slow backend never holds up the caller.
    pub fn record_detached(&self, job: Job) -> JoinHandle<()> {
        let sink = self.clone();
        tokio::spawn(async move { sink.record(&job).await })
    }
}
