use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::modules::render::model::{Job, JobStatus};

pub const UNKNOWN_REQUESTER: &str = "unknown";

/// Anonymized snapshot of a finished job. Holds no reference back to the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Number of script entries; a rough size metric, not a frame count.
    pub duration_frames: i32,
    pub resolution: Option<String>,
    pub quality: Option<String>,
    pub user_hash: String,
    pub status: JobStatus,
}

impl AnalyticsRecord {
    pub fn from_job(job: &Job) -> Self {
        Self {
            id: job.id,
            created_at: OffsetDateTime::now_utc(),
            duration_frames: i32::try_from(job.payload.script.len()).unwrap_or(i32::MAX),
            resolution: job.payload.resolution.clone(),
            quality: job.payload.quality.clone(),
            user_hash: hash_requester(job.requester.as_deref()),
            status: job.status,
        }
    }
}

/// One-way SHA-256 of the requester address, hex encoded.
pub fn hash_requester(address: Option<&str>) -> String {
    match address {
        Some(address) if !address.is_empty() => {
            let mut hasher = Sha256::new();
            hasher.update(address.as_bytes());
            hex::encode(hasher.finalize())
        }
        _ => UNKNOWN_REQUESTER.to_string(),
    }
}
