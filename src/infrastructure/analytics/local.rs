use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::modules::analytics::model::AnalyticsRecord;
use crate::modules::analytics::service::{AnalyticsBackend, AnalyticsError};

pub const LOCAL_LOG_FILE: &str = "analytics.json";

/// Appends records to a single pretty-printed JSON array on disk.
pub struct LocalLogAnalytics {
    path: PathBuf,
    // Serializes the read-modify-write cycle.
    write_lock: Mutex<()>,
}

impl LocalLogAnalytics {
    pub async fn new(data_dir: &Path) -> Self {
        if let Err(e) = tokio::fs::create_dir_all(data_dir).await {
            warn!(dir = %data_dir.display(), error = %e, "Analytics: could not create data directory");
        }

        Self {
            path: data_dir.join(LOCAL_LOG_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Value>, AnalyticsError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Vec<Value>>(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Analytics: corrupt local file, starting fresh");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl AnalyticsBackend for LocalLogAnalytics {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn insert(&self, record: &AnalyticsRecord) -> Result<(), AnalyticsError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await?;
        entries.push(serde_json::to_value(record)?);
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&entries)?).await?;
        Ok(())
    }
}
