use std::collections::HashMap;

use super::model::{Job, JobId, RenderPayload};

/// In-memory record of every job accepted since startup.
///
/// Records are never evicted; completed and failed jobs stay resolvable for
/// the lifetime of the process.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<JobId, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, payload: RenderPayload, requester: Option<String>) -> JobId {
        let mut job = Job::new(payload, requester);
        // v4 collisions are not expected, but an id must never be reused.
        while self.jobs.contains_key(&job.id) {
            job.id = uuid::Uuid::new_v4();
        }
        let id = job.id;
        self.jobs.insert(id, job);
        id
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn update<R>(&mut self, id: &JobId, mutation: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.jobs.get_mut(id).map(mutation)
    }

    pub fn count(&self) -> usize {
        self.jobs.len()
    }

    pub fn values(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::render::model::JobStatus;
    use std::collections::HashMap as Map;

    fn payload() -> RenderPayload {
        RenderPayload {
            script: vec![],
            participants: vec!["Ana".to_string()],
            chat_name: None,
            resolution: None,
            quality: None,
            participant_colors: Map::new(),
        }
    }

    #[test]
    fn create_returns_fresh_resolvable_ids() {
        let mut store = JobStore::new();
        let a = store.create(payload(), None);
        let b = store.create(payload(), None);

        assert_ne!(a, b);
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(&a).map(|j| j.status), Some(JobStatus::Queued));
    }

    #[test]
    fn update_unknown_id_is_none() {
        let mut store = JobStore::new();
        let result = store.update(&uuid::Uuid::new_v4(), |job| job.mark_processing());
        assert!(result.is_none());
        assert_eq!(store.count(), 0);
    }
}
