//! Asynchronous job tracking.
//!
//! Implements a `Submit`/`Status`/`Result` contract: a job moves
//! `Pending -> Processing -> (Completed | Failed)`, is retried exactly once
//! on a transient crash, and is evicted after 24h of retention. Storage is
//! an in-memory `Mutex<HashMap>` guarded the same way as
//! [`crate::core::response_cache::ResponseCache`]; callers that need
//! durability across restarts provide their own persistence layer in front
//! of this API.

use crate::core::types::{Job, JobStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

const RETENTION_HOURS: i64 = 24;

struct TrackedJob {
    job: Job,
    retries_remaining: u8,
}

/// Tracks submitted jobs and their lifecycle state.
pub struct JobManager {
    jobs: Mutex<HashMap<String, TrackedJob>>,
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

impl JobManager {
    pub fn new() -> Self {
        JobManager {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new job in `Pending` state and return its id.
    pub fn submit(&self, request_query: String) -> String {
        let job_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let job = Job {
            job_id: job_id.clone(),
            status: JobStatus::Pending,
            progress: 0.0,
            submitted_at: now,
            updated_at: now,
            request_query,
            result: None,
            error: None,
        };
        self.jobs.lock().unwrap().insert(
            job_id.clone(),
            TrackedJob {
                job,
                retries_remaining: 1,
            },
        );
        job_id
    }

    /// Transition a job to `Processing`.
    pub fn mark_processing(&self, job_id: &str) {
        self.update(job_id, |tracked| {
            tracked.job.status = JobStatus::Processing;
            tracked.job.progress = 0.0;
        });
    }

    pub fn update_progress(&self, job_id: &str, progress: f32) {
        self.update(job_id, |tracked| {
            tracked.job.progress = progress.clamp(0.0, 1.0);
        });
    }

    /// Mark the job `Completed`. Terminal states are never overwritten once set.
    pub fn complete(&self, job_id: &str, result: String) {
        self.update(job_id, |tracked| {
            if tracked.job.status == JobStatus::Completed || tracked.job.status == JobStatus::Failed {
                return;
            }
            tracked.job.status = JobStatus::Completed;
            tracked.job.progress = 1.0;
            tracked.job.result = Some(result);
        });
    }

    /// Report a failure. If a retry is still available, the job is reset to
    /// `Pending` instead of moving to `Failed`.
    pub fn fail(&self, job_id: &str, error: String) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(tracked) = jobs.get_mut(job_id) {
            if tracked.job.status == JobStatus::Completed || tracked.job.status == JobStatus::Failed {
                return;
            }
            if tracked.retries_remaining > 0 {
                tracked.retries_remaining -= 1;
                tracked.job.status = JobStatus::Pending;
                tracked.job.progress = 0.0;
                tracked.job.updated_at = Utc::now();
            } else {
                tracked.job.status = JobStatus::Failed;
                tracked.job.error = Some(error);
                tracked.job.updated_at = Utc::now();
            }
        }
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.lock().unwrap().get(job_id).map(|t| t.job.status)
    }

    pub fn result(&self, job_id: &str) -> Option<Job> {
        self.jobs.lock().unwrap().get(job_id).map(|t| t.job.clone())
    }

    /// Drop every job whose `updated_at` is older than the 24h retention
    /// window. Returns the number of jobs evicted.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.lock().unwrap();
        let cutoff = now - chrono::Duration::hours(RETENTION_HOURS);
        let before = jobs.len();
        jobs.retain(|_, tracked| tracked.job.updated_at >= cutoff);
        before - jobs.len()
    }

    fn update(&self, job_id: &str, mutator: impl FnOnce(&mut TrackedJob)) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(tracked) = jobs.get_mut(job_id) {
            mutator(tracked);
            tracked.job.updated_at = Utc::now();
        }
    }
}
