//! In-memory registry of conversion jobs.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use thiserror::Error;

use super::job::{ConversionJob, JobStatus};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },
}

/// Process-lifetime store of conversion jobs keyed by job id.
///
/// Reads take the shared lock, mutations the exclusive lock, and neither is
/// held for longer than a single field read or write. Callers only ever get
/// copies of a job, never a live reference.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, ConversionJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ConversionJob>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ConversionJob>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn modify<F>(&self, job_id: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut ConversionJob) -> Result<(), RegistryError>,
    {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| RegistryError::NotFound(job_id.to_string()))?;
        f(job)?;
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Registers a fresh `PENDING` job and returns a snapshot of it.
    pub fn create(&self, user_id: &str, url: &str) -> ConversionJob {
        let job = ConversionJob::new(user_id, url);
        self.write().insert(job.id.clone(), job.clone());
        job
    }

    /// Returns a snapshot of the job.
    pub fn get(&self, job_id: &str) -> Option<ConversionJob> {
        self.read().get(job_id).cloned()
    }

    /// Jobs belonging to `user_id`, newest first.
    pub fn jobs_for_user(&self, user_id: &str) -> Vec<ConversionJob> {
        let mut jobs: Vec<ConversionJob> = self
            .read()
            .values()
            .filter(|job| job.user_id == user_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Moves the job to `status` if the state machine allows it.
    pub fn transition(&self, job_id: &str, status: JobStatus) -> Result<(), RegistryError> {
        self.modify(job_id, |job| {
            if !job.status.can_transition_to(status) {
                return Err(RegistryError::IllegalTransition {
                    from: job.status,
                    to: status,
                });
            }
            job.status = status;
            if status.is_terminal() {
                job.completed_at = Some(Utc::now());
            }
            Ok(())
        })
    }

    /// Moves the job to `FAILED` and records why.
    pub fn fail(&self, job_id: &str, message: impl Into<String>) -> Result<(), RegistryError> {
        let message = message.into();
        self.modify(job_id, |job| {
            if !job.status.can_transition_to(JobStatus::Failed) {
                return Err(RegistryError::IllegalTransition {
                    from: job.status,
                    to: JobStatus::Failed,
                });
            }
            job.status = JobStatus::Failed;
            job.error = Some(message);
            job.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    pub fn record_content(&self, job_id: &str, content: String) -> Result<(), RegistryError> {
        self.modify(job_id, |job| {
            job.content = Some(content);
            Ok(())
        })
    }

    pub fn record_duration(&self, job_id: &str, duration_secs: f64) -> Result<(), RegistryError> {
        self.modify(job_id, |job| {
            job.duration_secs = Some(duration_secs);
            Ok(())
        })
    }

    pub fn record_audio_file(&self, job_id: &str, file_name: String) -> Result<(), RegistryError> {
        self.modify(job_id, |job| {
            job.audio_file_name = Some(file_name);
            Ok(())
        })
    }
}
