//! Job and tech mutations
//!
//! [`JobService`] turns external commands into store mutations. Every
//! successful operation returns the current state of the job (or the whole
//! job list), so clients can re-render straight from the response.
//!
//! Lenient cases:
//! - deleting an absent job succeeds as a no-op
//! - reorder skips ids it does not know; jobs it leaves out follow the listed
//!   ones in their previous relative order

mod requests;

pub use requests::{AddTech, CreateJob, JobRef, Reorder, UpdateJob};

use crate::error::{ShopError, ShopResult};
use crate::model::{Job, JobId, Tech, TechId};
use crate::store::JobStore;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use validator::Validate;

/// Job/tech mutation API over a shared store
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    completion_delay: Duration,
    pending: TaskTracker,
}

impl JobService {
    /// Create a service over `store`
    ///
    /// `completion_delay` is how long [`complete_job`](Self::complete_job)
    /// waits before deleting.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, completion_delay: Duration) -> Self {
        Self {
            store,
            completion_delay,
            pending: TaskTracker::new(),
        }
    }

    /// Wait for every scheduled completion delete to land
    ///
    /// Called on shutdown so a completed job cannot outlive the process.
    /// Completions scheduled after this returns are still tracked.
    pub async fn drain(&self) {
        let pending = self.pending.len();
        if pending > 0 {
            info!(pending, "Waiting for scheduled job completions");
        }
        self.pending.close();
        self.pending.wait().await;
        self.pending.reopen();
    }

    /// All jobs in display order
    pub async fn list_jobs(&self) -> ShopResult<Vec<Job>> {
        Ok(self.store.list_jobs().await?)
    }

    /// A single job
    pub async fn get_job(&self, id: &JobId) -> ShopResult<Job> {
        self.store
            .get_job(id)
            .await?
            .ok_or_else(|| ShopError::JobNotFound(id.clone()))
    }

    /// Create a job ranked after every existing job
    pub async fn create_job(&self, request: CreateJob) -> ShopResult<Job> {
        request.validate()?;

        let order = u32::try_from(self.store.count_jobs().await?).unwrap_or(u32::MAX);
        let job = Job::new(request.title.trim(), request.quoted_hours, order);
        self.store.insert_job(&job).await?;

        info!(
            job_id = %job.id,
            title = %job.title,
            quoted_hours = job.quoted_hours,
            order,
            "Job created"
        );
        Ok(job)
    }

    /// Edit title and/or quote
    ///
    /// Accrued time is not touched, even when the new quote is below it.
    pub async fn update_job(&self, id: &JobId, request: UpdateJob) -> ShopResult<Job> {
        request.validate()?;

        let changes = request.into_changes();
        if !changes.is_empty() && !self.store.update_job(id, &changes).await? {
            return Err(ShopError::JobNotFound(id.clone()));
        }

        let job = self.get_job(id).await?;
        info!(
            job_id = %id,
            title = ?changes.title,
            quoted_hours = ?changes.quoted_hours,
            "Job updated"
        );
        Ok(job)
    }

    /// Delete a job and its techs; absent ids are a no-op
    pub async fn delete_job(&self, id: &JobId) -> ShopResult<()> {
        if self.store.delete_job(id).await? {
            info!(job_id = %id, "Job deleted");
        } else {
            debug!(job_id = %id, "Delete of absent job ignored");
        }
        Ok(())
    }

    /// Mark a job complete and delete it after the completion delay
    ///
    /// Returns the job as it stands now. Its timers keep running until the
    /// deferred delete lands.
    pub async fn complete_job(&self, id: &JobId) -> ShopResult<Job> {
        let job = self.get_job(id).await?;

        let store = Arc::clone(&self.store);
        let delay = self.completion_delay;
        let job_id = id.clone();
        self.pending.spawn(async move {
            tokio::time::sleep(delay).await;
            match store.delete_job(&job_id).await {
                Ok(true) => info!(job_id = %job_id, "Completed job removed"),
                Ok(false) => debug!(job_id = %job_id, "Completed job already gone"),
                Err(error) => warn!(job_id = %job_id, %error, "Failed to remove completed job"),
            }
        });

        info!(job_id = %id, delay_ms = delay.as_millis(), "Job completion scheduled");
        Ok(job)
    }

    /// Attach a new, stopped tech to a job
    pub async fn add_tech(&self, job_id: &JobId, request: AddTech) -> ShopResult<Job> {
        request.validate()?;

        let tech = Tech::new(request.name.trim());
        if !self.store.insert_tech(job_id, &tech).await? {
            return Err(ShopError::JobNotFound(job_id.clone()));
        }

        info!(job_id = %job_id, tech_id = %tech.id, name = %tech.name, "Tech added");
        self.get_job(job_id).await
    }

    /// Flip a tech between stopped and working
    pub async fn toggle_tech(&self, job_id: &JobId, tech_id: &TechId) -> ShopResult<Job> {
        let job = self.get_job(job_id).await?;
        let tech_missing = || ShopError::TechNotFound {
            job: job_id.clone(),
            tech: tech_id.clone(),
        };

        if job.tech(tech_id).is_none() || !self.store.toggle_tech(job_id, tech_id, Utc::now()).await? {
            return Err(tech_missing());
        }

        let job = self.get_job(job_id).await?;
        let is_working = job.tech(tech_id).ok_or_else(tech_missing)?.is_working;
        info!(job_id = %job_id, tech_id = %tech_id, is_working, "Tech toggled");
        Ok(job)
    }

    /// Flip a job's diagnostic timer
    pub async fn toggle_diagnostic(&self, job_id: &JobId) -> ShopResult<Job> {
        if !self.store.toggle_diagnostic(job_id).await? {
            return Err(ShopError::JobNotFound(job_id.clone()));
        }

        let job = self.get_job(job_id).await?;
        info!(
            job_id = %job_id,
            is_running = job.diagnostic.is_running,
            "Diagnostic timer toggled"
        );
        Ok(job)
    }

    /// Rank jobs by their position in `request.jobs`
    ///
    /// Known ids take ranks `0..k` in the order supplied. Unknown and
    /// repeated ids are skipped. Jobs left out of the list follow as `k..n`
    /// in their previous relative order, so ranks stay unique and dense.
    pub async fn reorder(&self, request: Reorder) -> ShopResult<Vec<Job>> {
        let current = self.store.list_jobs().await?;
        let known: HashSet<&JobId> = current.iter().map(|job| &job.id).collect();

        let mut listed: HashSet<&JobId> = HashSet::with_capacity(current.len());
        let mut sequence: Vec<JobId> = Vec::with_capacity(current.len());
        let mut unknown = 0usize;
        for job in &request.jobs {
            let id = job.id();
            if !known.contains(id) {
                unknown += 1;
            } else if listed.insert(id) {
                sequence.push(id.clone());
            }
        }
        sequence.extend(
            current
                .iter()
                .filter(|job| !listed.contains(&job.id))
                .map(|job| job.id.clone()),
        );

        if unknown > 0 {
            warn!(unknown, "Reorder skipped unknown jobs");
        }

        let ranks: Vec<(JobId, u32)> = sequence.into_iter().zip(0u32..).collect();
        let updated = self.store.set_orders(&ranks).await?;
        info!(listed = listed.len(), updated, "Jobs reordered");

        self.list_jobs().await
    }
}
