use std::path::PathBuf;

use uuid::Uuid;
use validator::Validate;

use super::dto::{EnqueueResponse, JobStatusResponse, RenderRequest};
use super::queue::QueueError;
use crate::state::AppState;

pub struct RenderService;

impl RenderService {
    pub async fn enqueue(
        state: AppState,
        req: RenderRequest,
        requester: Option<String>,
    ) -> Result<EnqueueResponse, QueueError> {
        req.validate().map_err(|_| QueueError::Validation)?;
        let payload = req.into_payload().ok_or(QueueError::Validation)?;

        let admission = state.queue.enqueue(payload, requester).await?;

        Ok(EnqueueResponse {
            success: true,
            job_id: admission.job_id,
            position: admission.position,
        })
    }

    pub async fn status(state: AppState, id: &str) -> Result<JobStatusResponse, QueueError> {
        let id = Uuid::parse_str(id).map_err(|_| QueueError::NotFound)?;
        let snapshot = state.queue.status(&id).await?;

        Ok(JobStatusResponse {
            id: snapshot.id,
            status: snapshot.status,
            position: snapshot.position,
            error: snapshot.error,
        })
    }

    pub async fn artifact(state: AppState, id: &str) -> Result<PathBuf, QueueError> {
        let id = Uuid::parse_str(id).map_err(|_| QueueError::ArtifactNotReady)?;
        state.queue.artifact(&id).await
    }
}
