use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, info_span, Instrument};

use crate::infrastructure::renderer::{RenderEngine, RenderError};
use crate::modules::analytics::AnalyticsSink;
use crate::modules::render::composition::CompositionDescriptor;
use crate::modules::render::model::Job;
use crate::modules::render::queue::{DrainSignals, RenderQueue};

/// The single consumer of the render queue.
///
/// Every drain signal runs at most one job; after each job the worker posts a
/// fresh signal to itself so the next queued job is picked up without any
/// external trigger.
pub struct RenderWorker {
    queue: RenderQueue,
    engine: Arc<dyn RenderEngine>,
    analytics: AnalyticsSink,
    output_dir: PathBuf,
    render_timeout: Option<Duration>,
}

impl RenderWorker {
    pub fn new(
        queue: RenderQueue,
        engine: Arc<dyn RenderEngine>,
        analytics: AnalyticsSink,
        output_dir: PathBuf,
        render_timeout: Option<Duration>,
    ) -> Self {
        Self {
            queue,
            engine,
            analytics,
            output_dir,
            render_timeout,
        }
    }

    pub async fn run(self, mut signals: DrainSignals) {
        info!("🎥 Render worker started");

        while signals.recv().await.is_some() {
            let Some(job) = self.queue.start_next().await else {
                continue;
            };

            let span = info_span!("render_job", job_id = %job.id);
            self.run_job(job).instrument(span).await;

            self.queue.signal_drain();
        }

        info!("Render worker stopped: drain channel closed");
    }

    async fn run_job(&self, job: Job) {
        let outcome = self.process_job(&job).await;
        let rendered = outcome.is_ok();

        match self.queue.finish(&job.id, outcome).await {
            Ok(finished) if rendered => {
                self.analytics.record_detached(finished);
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Failed to record job outcome"),
        }
    }

    async fn process_job(&self, job: &Job) -> Result<PathBuf, String> {
        let descriptor = CompositionDescriptor::build(job.id, &job.payload);
        let output = self.output_dir.join(format!("{}.mp4", job.id));

        info!(
            frames = descriptor.duration_in_frames,
            crf = descriptor.crf,
            output = %output.display(),
            "Processing job"
        );

        match self.render(descriptor, output.clone()).await {
            Ok(()) => {
                info!("✅ Job completed");
                Ok(output)
            }
            Err(e) => {
                error!(error = %e, "❌ Job failed");
                Err(e.to_string())
            }
        }
    }

    /// Runs the engine on its own task so a panic ends the job, not the worker.
    async fn render(&self, descriptor: CompositionDescriptor, output: PathBuf) -> Result<(), RenderError> {
        let engine = Arc::clone(&self.engine);
        let mut task =
            tokio::spawn(async move { engine.render(&descriptor, &output).await }.in_current_span());

        let joined = match self.render_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    // Dropping the render future kills the child process.
                    task.abort();
                    return Err(RenderError::TimedOut(limit));
                }
            },
            None => task.await,
        };

        joined.unwrap_or_else(|e| Err(RenderError::Aborted(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::analytics::{AnalyticsBackend, AnalyticsError, AnalyticsRecord};
    use crate::modules::render::model::{JobStatus, RenderPayload, ScriptEntry};
    use crate::modules::render::queue::ProcessorState;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    /// Writes the job id into the output; fails for chats named "fail" and
    /// panics for chats named "panic".
    struct ScriptedEngine {
        renders: Mutex<Vec<String>>,
        hang_for: Option<Duration>,
    }

    #[async_trait]
    impl RenderEngine for ScriptedEngine {
        async fn prepare(&self) -> Result<(), RenderError> {
            Ok(())
        }

        async fn render(&self, descriptor: &CompositionDescriptor, output: &Path) -> Result<(), RenderError> {
            self.renders
                .lock()
                .await
                .push(descriptor.input_props.render_id.to_string());
            if let Some(delay) = self.hang_for {
                tokio::time::sleep(delay).await;
            }
            if descriptor.input_props.chat_name.as_deref() == Some("panic") {
                panic!("renderer blew up");
            }
            if descriptor.input_props.chat_name.as_deref() == Some("fail") {
                return Err(RenderError::Failed {
                    exit_code: Some(1),
                    stderr: "bad frame".to_string(),
                });
            }
            tokio::fs::write(output, descriptor.input_props.render_id.to_string()).await?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingBackend {
        records: Mutex<Vec<AnalyticsRecord>>,
    }

    #[async_trait]
    impl AnalyticsBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn insert(&self, record: &AnalyticsRecord) -> Result<(), AnalyticsError> {
            self.records.lock().await.push(record.clone());
            Ok(())
        }
    }

    fn payload(chat_name: &str) -> RenderPayload {
        RenderPayload {
            script: vec![ScriptEntry {
                sender: "Ana".to_string(),
                message: "hello".to_string(),
            }],
            participants: vec!["Ana".to_string()],
            chat_name: Some(chat_name.to_string()),
            resolution: None,
            quality: None,
            participant_colors: HashMap::new(),
        }
    }

    async fn wait_terminal(queue: &RenderQueue, id: &uuid::Uuid) -> JobStatus {
        for _ in 0..200 {
            let status = queue.status(id).await.unwrap().status;
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never finished");
    }

    struct Harness {
        queue: RenderQueue,
        engine: Arc<ScriptedEngine>,
        backend: Arc<CountingBackend>,
        _dir: TempDir,
    }

    fn spawn_worker(hang_for: Option<Duration>, timeout: Option<Duration>) -> Harness {
        let dir = TempDir::new().unwrap();
        let (queue, signals) = RenderQueue::new(50);
        let engine = Arc::new(ScriptedEngine {
            renders: Mutex::new(Vec::new()),
            hang_for,
        });
        let backend = Arc::new(CountingBackend::default());
        let worker = RenderWorker::new(
            queue.clone(),
            engine.clone(),
            AnalyticsSink::new(backend.clone()),
            dir.path().to_path_buf(),
            timeout,
        );
        tokio::spawn(worker.run(signals));
        Harness {
            queue,
            engine,
            backend,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn drains_in_submission_order() {
        let h = spawn_worker(None, None);
        let ids = [
            h.queue.enqueue(payload("a"), None).await.unwrap().job_id,
            h.queue.enqueue(payload("b"), None).await.unwrap().job_id,
            h.queue.enqueue(payload("c"), None).await.unwrap().job_id,
        ];

        for id in &ids {
            assert_eq!(wait_terminal(&h.queue, id).await, JobStatus::Completed);
        }

        let rendered = h.engine.renders.lock().await.clone();
        let expected: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(rendered, expected);
    }

    #[tokio::test]
    async fn failed_render_is_terminal_and_does_not_stop_the_queue() {
        let h = spawn_worker(None, None);
        let bad = h.queue.enqueue(payload("fail"), None).await.unwrap().job_id;
        let good = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;

        assert_eq!(wait_terminal(&h.queue, &bad).await, JobStatus::Error);
        assert_eq!(wait_terminal(&h.queue, &good).await, JobStatus::Completed);

        let failed = h.queue.get(&bad).await.unwrap();
        assert!(failed.error.unwrap().contains("bad frame"));
        assert!(failed.file_path.is_none());

        // The failed job was rendered exactly once.
        let renders = h.engine.renders.lock().await;
        assert_eq!(renders.iter().filter(|id| **id == bad.to_string()).count(), 1);
    }

    #[tokio::test]
    async fn completed_job_points_at_rendered_file() {
        let h = spawn_worker(None, None);
        let id = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;
        wait_terminal(&h.queue, &id).await;

        let path = h.queue.artifact(&id).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), id.to_string());
    }

    #[tokio::test]
    async fn analytics_recorded_once_per_completed_job() {
        let h = spawn_worker(None, None);
        let a = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;
        let b = h.queue.enqueue(payload("fail"), None).await.unwrap().job_id;
        let c = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;
        wait_terminal(&h.queue, &a).await;
        assert_eq!(wait_terminal(&h.queue, &b).await, JobStatus::Error);
        wait_terminal(&h.queue, &c).await;

        for _ in 0..100 {
            if h.backend.records.lock().await.len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Give a stray record for the failed job time to land.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let records = h.backend.records.lock().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records.iter().filter(|r| r.id == a).count(), 1);
        assert_eq!(records.iter().filter(|r| r.id == c).count(), 1);
        assert!(records.iter().all(|r| r.id != b));
        assert!(records.iter().all(|r| r.status == JobStatus::Completed));
    }

    #[tokio::test]
    async fn failed_job_produces_no_analytics_record() {
        let h = spawn_worker(None, None);
        let id = h.queue.enqueue(payload("fail"), None).await.unwrap().job_id;
        assert_eq!(wait_terminal(&h.queue, &id).await, JobStatus::Error);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.backend.records.lock().await.is_empty());
    }

    #[tokio::test]
    async fn panicking_engine_fails_the_job_and_keeps_draining() {
        let h = spawn_worker(None, None);
        let crashed = h.queue.enqueue(payload("panic"), None).await.unwrap().job_id;
        let next = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;

        assert_eq!(wait_terminal(&h.queue, &crashed).await, JobStatus::Error);
        let job = h.queue.get(&crashed).await.unwrap();
        assert!(job.error.unwrap().contains("aborted"));

        assert_eq!(wait_terminal(&h.queue, &next).await, JobStatus::Completed);
        assert_eq!(h.queue.processor_state().await, ProcessorState::Idle);
    }

    #[tokio::test]
    async fn timeout_turns_a_stuck_render_into_an_error() {
        let h = spawn_worker(Some(Duration::from_secs(30)), Some(Duration::from_millis(50)));
        let id = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;

        assert_eq!(wait_terminal(&h.queue, &id).await, JobStatus::Error);
        let job = h.queue.get(&id).await.unwrap();
        assert!(job.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn without_timeout_a_stuck_render_blocks_the_queue() {
        let h = spawn_worker(Some(Duration::from_secs(30)), None);
        let stuck = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;
        let behind = h.queue.enqueue(payload("ok"), None).await.unwrap().job_id;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.queue.status(&stuck).await.unwrap().status, JobStatus::Processing);
        let waiting = h.queue.status(&behind).await.unwrap();
        assert_eq!(waiting.status, JobStatus::Queued);
        assert_eq!(waiting.position, Some(0));
    }
}
