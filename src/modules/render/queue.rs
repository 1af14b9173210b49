use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::dto::MISSING_FIELDS_MESSAGE;
use super::model::{IllegalTransition, Job, JobId, JobStatus, RenderPayload};
use super::store::JobStore;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("{}", MISSING_FIELDS_MESSAGE)]
    Validation,
    #[error("Server is busy. Please try again later.")]
    Capacity,
    #[error("Job not found")]
    NotFound,
    #[error("File not ready or not found")]
    ArtifactNotReady,
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Busy(JobId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub job_id: JobId,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub position: Option<usize>,
    pub error: Option<String>,
}

struct QueueState {
    store: JobStore,
    pending: VecDeque<JobId>,
    processor: ProcessorState,
}

/// Receiving half of the drain signal. Owned by the render worker.
pub struct DrainSignals(mpsc::Receiver<()>);

impl DrainSignals {
    pub async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

/// Job store, FIFO of waiting job ids and the processor state, behind one lock.
#[derive(Clone)]
pub struct RenderQueue {
    state: Arc<Mutex<QueueState>>,
    drain: mpsc::Sender<()>,
    max_depth: usize,
}

impl RenderQueue {
    pub fn new(max_depth: usize) -> (Self, DrainSignals) {
        // One slot is enough: a pending signal already guarantees a drain pass.
        let (drain, signals) = mpsc::channel(1);
        let queue = Self {
            state: Arc::new(Mutex::new(QueueState {
                store: JobStore::new(),
                pending: VecDeque::new(),
                processor: ProcessorState::Idle,
            })),
            drain,
            max_depth,
        };
        (queue, DrainSignals(signals))
    }

    pub async fn enqueue(
        &self,
        payload: RenderPayload,
        requester: Option<String>,
    ) -> Result<Admission, QueueError> {
        let admission = {
            let mut state = self.state.lock().await;
            if state.pending.len() > self.max_depth {
                warn!(queued = state.pending.len(), "Queue at capacity, rejecting submission");
                return Err(QueueError::Capacity);
            }

            let job_id = state.store.create(payload, requester);
            let position = state.pending.len();
            state.pending.push_back(job_id);
            Admission { job_id, position }
        };

        info!(job_id = %admission.job_id, position = admission.position, "Job queued");
        self.signal_drain();
        Ok(admission)
    }

    /// Idempotent: a signal that is already pending covers this one.
    pub fn signal_drain(&self) {
        let _ = self.drain.try_send(());
    }

    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.state.lock().await.store.get(id).cloned()
    }

    pub async fn status(&self, id: &JobId) -> Result<StatusSnapshot, QueueError> {
        let state = self.state.lock().await;
        let job = state.store.get(id).ok_or(QueueError::NotFound)?;

        let position = match job.status {
            JobStatus::Queued => state.pending.iter().position(|queued| queued == id),
            _ => None,
        };

        Ok(StatusSnapshot {
            id: job.id,
            status: job.status,
            position,
            error: job.error.clone(),
        })
    }

    pub async fn artifact(&self, id: &JobId) -> Result<PathBuf, QueueError> {
        let state = self.state.lock().await;
        state
            .store
            .get(id)
            .and_then(Job::artifact)
            .cloned()
            .ok_or(QueueError::ArtifactNotReady)
    }

    pub async fn queued_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Every job ever accepted, whatever its status.
    pub async fn job_count(&self) -> usize {
        self.state.lock().await.store.count()
    }

    pub async fn processing_count(&self) -> usize {
        self.state
            .lock()
            .await
            .store
            .values()
            .filter(|job| job.status == JobStatus::Processing)
            .count()
    }

    pub async fn processor_state(&self) -> ProcessorState {
        self.state.lock().await.processor
    }

    /// `Idle -> Busy`: pops the head of the queue and marks it processing.
    ///
    /// Returns `None` when the processor is already busy or nothing is waiting.
    pub async fn start_next(&self) -> Option<Job> {
        let mut state = self.state.lock().await;
        if let ProcessorState::Busy(current) = state.processor {
            debug!(job_id = %current, "Drain signal while busy, ignoring");
            return None;
        }

        while let Some(job_id) = state.pending.pop_front() {
            let started = state
                .store
                .update(&job_id, |job| job.mark_processing().map(|_| job.clone()));

            match started {
                Some(Ok(job)) => {
                    state.processor = ProcessorState::Busy(job_id);
                    return Some(job);
                }
                Some(Err(e)) => {
                    warn!(job_id = %job_id, error = %e, "Skipping queued id in unexpected state");
                }
                None => {
                    warn!(job_id = %job_id, "Skipping queued id with no job record");
                }
            }
        }

        None
    }

    /// `Busy -> Idle`: records the outcome of the job that was started last.
    pub async fn finish(
        &self,
        job_id: &JobId,
        outcome: Result<PathBuf, String>,
    ) -> Result<Job, QueueError> {
        let mut state = self.state.lock().await;
        if state.processor == ProcessorState::Busy(*job_id) {
            state.processor = ProcessorState::Idle;
        }

        let job = state
            .store
            .update(job_id, |job| -> Result<Job, IllegalTransition> {
                match outcome {
                    Ok(path) => job.mark_completed(path)?,
                    Err(error) => job.mark_failed(error)?,
                }
                Ok(job.clone())
            })
            .ok_or(QueueError::NotFound)??;
        Ok(job)
    }
}
