//! In-memory job store

use super::{JobChanges, JobStore, StoreResult};
use crate::accrual::Accrual;
use crate::model::{Job, JobId, Tech, TechId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Job store held in process memory
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_job<T>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> T) -> Option<T> {
        self.jobs.write().get_mut(id).map(f)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().values().cloned().collect();
        jobs.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn job_ids(&self) -> StoreResult<Vec<JobId>> {
        Ok(self.jobs.read().keys().cloned().collect())
    }

    async fn get_job(&self, id: &JobId) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().get(id).cloned())
    }

    async fn count_jobs(&self) -> StoreResult<usize> {
        Ok(self.jobs.read().len())
    }

    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        self.jobs.write().insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update_job(&self, id: &JobId, changes: &JobChanges) -> StoreResult<bool> {
        Ok(self
            .with_job(id, |job| {
                if let Some(title) = &changes.title {
                    job.title.clone_from(title);
                }
                if let Some(quoted_hours) = changes.quoted_hours {
                    job.quoted_hours = quoted_hours;
                }
            })
            .is_some())
    }

    async fn delete_job(&self, id: &JobId) -> StoreResult<bool> {
        Ok(self.jobs.write().remove(id).is_some())
    }

    async fn insert_tech(&self, job_id: &JobId, tech: &Tech) -> StoreResult<bool> {
        Ok(self
            .with_job(job_id, |job| job.techs.push(tech.clone()))
            .is_some())
    }

    async fn toggle_tech(
        &self,
        job_id: &JobId,
        tech_id: &TechId,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self
            .with_job(job_id, |job| {
                job.tech_mut(tech_id).map(|tech| tech.toggle(at)).is_some()
            })
            .unwrap_or(false))
    }

    async fn toggle_diagnostic(&self, job_id: &JobId) -> StoreResult<bool> {
        Ok(self
            .with_job(job_id, |job| job.diagnostic.toggle())
            .is_some())
    }

    async fn set_orders(&self, ranks: &[(JobId, u32)]) -> StoreResult<usize> {
        let mut jobs = self.jobs.write();
        let mut updated = 0;
        for (id, order) in ranks {
            if let Some(job) = jobs.get_mut(id) {
                job.order = *order;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn record_accrual(&self, id: &JobId, accrual: &Accrual) -> StoreResult<bool> {
        Ok(self
            .with_job(id, |job| {
                if let Some(time_spent) = accrual.time_spent {
                    job.time_spent = time_spent.min(job.quoted_hours.max(job.time_spent));
                }
                if let Some(diagnostic_time) = accrual.diagnostic_time {
                    job.diagnostic.time = diagnostic_time;
                }
            })
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Job) {
        let store = MemoryStore::new();
        let mut job = Job::new("Brake job", 2.0, 0);
        job.techs.push(Tech::new("Sam"));
        store.insert_job(&job).await.unwrap();
        (store, job)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (store, job) = seeded().await;
        assert_eq!(store.get_job(&job.id).await.unwrap(), Some(job.clone()));
        assert_eq!(store.count_jobs().await.unwrap(), 1);
        assert_eq!(store.job_ids().await.unwrap(), vec![job.id]);
    }

    #[tokio::test]
    async fn test_list_sorted_by_order() {
        let store = MemoryStore::new();
        for (title, order) in [("c", 2), ("a", 0), ("b", 1)] {
            store.insert_job(&Job::new(title, 1.0, order)).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_jobs()
            .await
            .unwrap()
            .into_iter()
            .map(|job| job.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_techs() {
        let (store, job) = seeded().await;
        assert!(store.delete_job(&job.id).await.unwrap());
        assert!(store.get_job(&job.id).await.unwrap().is_none());
        assert!(!store.delete_job(&job.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_tech() {
        let (store, job) = seeded().await;
        let tech_id = job.techs[0].id.clone();
        let now = Utc::now();

        assert!(store.toggle_tech(&job.id, &tech_id, now).await.unwrap());
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert!(stored.techs[0].is_working);
        assert_eq!(stored.techs[0].start_time, Some(now));

        assert!(!store
            .toggle_tech(&job.id, &TechId::from("missing"), now)
            .await
            .unwrap());
        assert!(!store
            .toggle_tech(&JobId::from("missing"), &tech_id, now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_accrual_leaves_other_fields_alone() {
        let (store, job) = seeded().await;
        store
            .update_job(
                &job.id,
                &JobChanges {
                    title: None,
                    quoted_hours: Some(5.0),
                },
            )
            .await
            .unwrap();

        let accrual = Accrual {
            time_spent: Some(0.25),
            diagnostic_time: None,
        };
        assert!(store.record_accrual(&job.id, &accrual).await.unwrap());

        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert!((stored.time_spent - 0.25).abs() < f64::EPSILON);
        assert!((stored.quoted_hours - 5.0).abs() < f64::EPSILON);
        assert!((stored.diagnostic.time - 0.0).abs() < f64::EPSILON);
        assert_eq!(stored.title, "Brake job");
    }

    #[tokio::test]
    async fn test_accrual_clamped_to_current_quote() {
        let (store, job) = seeded().await;
        let lower_quote = |quoted_hours| JobChanges {
            title: None,
            quoted_hours: Some(quoted_hours),
        };
        let accrual = Accrual {
            time_spent: Some(1.5),
            diagnostic_time: None,
        };

        store.update_job(&job.id, &lower_quote(1.0)).await.unwrap();
        store.record_accrual(&job.id, &accrual).await.unwrap();
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert!((stored.time_spent - 1.0).abs() < f64::EPSILON);

        store.update_job(&job.id, &lower_quote(0.5)).await.unwrap();
        store.record_accrual(&job.id, &accrual).await.unwrap();
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert!((stored.time_spent - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_set_orders_skips_unknown_ids() {
        let (store, job) = seeded().await;
        let updated = store
            .set_orders(&[(JobId::from("ghost"), 0), (job.id.clone(), 7)])
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(store.get_job(&job.id).await.unwrap().unwrap().order, 7);
    }
}
