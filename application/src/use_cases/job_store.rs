//! Bounded in-memory store of asynchronous protocol jobs
//!
//! Finished jobs are evicted once they outlive the retention TTL, and the
//! oldest finished jobs go first when the store exceeds its capacity.
//! Running jobs are never evicted. Nothing survives a restart.

use crate::config::JobRetention;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use toolmesh_domain::{JobId, ProtocolJob};
use tracing::debug;

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, ProtocolJob>>,
    retention: JobRetention,
}

impl JobStore {
    pub fn new(retention: JobRetention) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    pub fn retention(&self) -> JobRetention {
        self.retention
    }

    /// Add a job, pruning expired and surplus finished jobs first.
    pub async fn insert(&self, job: ProtocolJob) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.clone(), job);
        Self::prune_locked(&mut jobs, self.retention, Utc::now());
    }

    pub async fn get(&self, id: &JobId) -> Option<ProtocolJob> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Mutate a job in place. Returns `false` when the job is gone.
    pub async fn update<F>(&self, id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut ProtocolJob),
    {
        match self.jobs.write().await.get_mut(id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<ProtocolJob> {
        let mut jobs: Vec<ProtocolJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Apply the retention policy as of `now`, returning how many jobs were dropped.
    pub async fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        Self::prune_locked(&mut jobs, self.retention, now)
    }

    fn prune_locked(
        jobs: &mut HashMap<JobId, ProtocolJob>,
        retention: JobRetention,
        now: DateTime<Utc>,
    ) -> usize {
        let before = jobs.len();
        let ttl = TimeDelta::from_std(retention.ttl).unwrap_or(TimeDelta::MAX);

        jobs.retain(|_, job| match job.completed_at {
            Some(done) if job.is_finished() => now.signed_duration_since(done) <= ttl,
            _ => true,
        });

        if jobs.len() > retention.capacity {
            let mut finished: Vec<(DateTime<Utc>, JobId)> = jobs
                .values()
                .filter(|job| job.is_finished())
                .map(|job| (job.completed_at.unwrap_or(job.started_at), job.id.clone()))
                .collect();
            finished.sort();

            let surplus = jobs.len() - retention.capacity;
            for (_, id) in finished.into_iter().take(surplus) {
                jobs.remove(&id);
            }
        }

        let evicted = before - jobs.len();
        if evicted > 0 {
            debug!(evicted, remaining = jobs.len(), "Evicted finished protocol jobs");
        }
        evicted
    }
}
