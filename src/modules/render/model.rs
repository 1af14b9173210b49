use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// `queued -> processing -> {completed | error}`; nothing else.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScriptEntry {
    pub sender: String,
    pub message: String,
}

/// The validated render request. Never mutated after the job is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPayload {
    pub script: Vec<ScriptEntry>,
    pub participants: Vec<String>,
    pub chat_name: Option<String>,
    pub resolution: Option<String>,
    pub quality: Option<String>,
    pub participant_colors: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub payload: Arc<RenderPayload>,
    /// Raw requester address; only read to derive the analytics hash.
    pub requester: Option<String>,
    pub created_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub file_path: Option<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal job transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl Job {
    pub fn new(payload: RenderPayload, requester: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            payload: Arc::new(payload),
            requester,
            created_at: OffsetDateTime::now_utc(),
            started_at: None,
            completed_at: None,
            file_path: None,
            error: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), IllegalTransition> {
        if !self.status.can_transition_to(next) {
            return Err(IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_processing(&mut self) -> Result<(), IllegalTransition> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub fn mark_completed(&mut self, file_path: PathBuf) -> Result<(), IllegalTransition> {
        self.transition(JobStatus::Completed)?;
        self.file_path = Some(file_path);
        self.completed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: String) -> Result<(), IllegalTransition> {
        self.transition(JobStatus::Error)?;
        self.error = Some(error);
        self.completed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    /// The artifact is only handed out once the job has completed.
    pub fn artifact(&self) -> Option<&PathBuf> {
        match self.status {
            JobStatus::Completed => self.file_path.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RenderPayload {
        RenderPayload {
            script: vec![ScriptEntry {
                sender: "Ana".to_string(),
                message: "hi".to_string(),
            }],
            participants: vec!["Ana".to_string(), "Bo".to_string()],
            chat_name: None,
            resolution: None,
            quality: None,
            participant_colors: HashMap::new(),
        }
    }

    #[test]
    fn new_job_starts_queued_without_artifact() {
        let job = Job::new(payload(), Some("10.0.0.1".to_string()));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.file_path.is_none());
        assert!(job.started_at.is_none());
        assert!(job.artifact().is_none());
    }

    #[test]
    fn happy_path_sets_timestamps_and_artifact() {
        let mut job = Job::new(payload(), None);
        job.mark_processing().unwrap();
        assert!(job.started_at.is_some());
        job.mark_completed(PathBuf::from("/tmp/out.mp4")).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert_eq!(job.artifact(), Some(&PathBuf::from("/tmp/out.mp4")));
    }

    #[test]
    fn failure_records_error_and_no_artifact() {
        let mut job = Job::new(payload(), None);
        job.mark_processing().unwrap();
        job.mark_failed("encoder crashed".to_string()).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("encoder crashed"));
        assert!(job.artifact().is_none());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut job = Job::new(payload(), None);
        job.mark_processing().unwrap();
        job.mark_completed(PathBuf::from("/tmp/out.mp4")).unwrap();

        let err = job.mark_failed("late".to_string()).unwrap_err();
        assert_eq!(err.from, JobStatus::Completed);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
        assert!(job.mark_processing().is_err());
    }

    #[test]
    fn queued_job_cannot_skip_processing() {
        let mut job = Job::new(payload(), None);
        assert!(job.mark_completed(PathBuf::from("/tmp/x.mp4")).is_err());
        assert!(job.mark_failed("x".to_string()).is_err());
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.file_path.is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }
}
