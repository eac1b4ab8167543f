//! Periodic labor and diagnostic time accrual
//!
//! Once per second the [`AccrualEngine`] scans every job and converts the
//! elapsed second into domain time:
//!
//! - each working tech adds one second of labor to the job's pooled
//!   `time_spent`, clamped to `quoted_hours`
//! - a running diagnostic timer adds one second to `diagnostic.time`, unclamped
//!
//! Every tick stands for exactly one second regardless of measured wall time.
//! Missed ticks are not replayed. A failure on one job is logged and skipped;
//! the scan carries on with the rest, and the next tick re-derives everything
//! from the store.
//!
//! # Example
//!
//! ```rust,no_run
//! use shop_dashboard::accrual::AccrualEngine;
//! use shop_dashboard::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let engine = AccrualEngine::new(Arc::new(MemoryStore::new()));
//! let handle = engine.spawn();
//!
//! // ... serve requests ...
//!
//! handle.shutdown().await;
//! # }
//! ```

use crate::model::hours::add_seconds;
use crate::model::Job;
use crate::store::JobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Fixed engine period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// New time values produced by one tick for a single job
///
/// `None` leaves the stored field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accrual {
    /// New pooled labor time in hours
    pub time_spent: Option<f64>,
    /// New diagnostic time in hours
    pub diagnostic_time: Option<f64>,
}

impl Accrual {
    /// Compute one second of accrual for `job`
    ///
    /// Returns `None` when nothing changes, so idle jobs are never written.
    /// Labor time already at or above the quote (after the quote was lowered,
    /// for example) is left as is: a tick never lowers it.
    #[must_use]
    pub fn one_second(job: &Job) -> Option<Self> {
        let active = u32::try_from(job.active_tech_count()).unwrap_or(u32::MAX);

        let time_spent = (active > 0 && !job.is_at_quote())
            .then(|| add_seconds(job.time_spent, active).min(job.quoted_hours));

        let diagnostic_time = job
            .diagnostic
            .is_running
            .then(|| add_seconds(job.diagnostic.time, 1));

        let accrual = Self {
            time_spent,
            diagnostic_time,
        };
        (!accrual.is_empty()).then_some(accrual)
    }

    /// Whether this accrual changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.time_spent.is_none() && self.diagnostic_time.is_none()
    }
}

/// Outcome of one scan over all jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs examined
    pub scanned: usize,
    /// Jobs whose time fields were written
    pub updated: usize,
    /// Jobs skipped because of a store error
    pub failed: usize,
}

/// Per-second accrual driver
#[derive(Clone)]
pub struct AccrualEngine {
    store: Arc<dyn JobStore>,
}

impl AccrualEngine {
    /// Create an engine over the shared store
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Run one scan-and-update pass
    ///
    /// Each job is read and written on its own so that one bad record cannot
    /// stall accrual for the rest of the shop.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let ids = match self.store.job_ids().await {
            Ok(ids) => ids,
            Err(error) => {
                warn!(%error, "Accrual tick skipped: could not list jobs");
                return report;
            }
        };

        for id in ids {
            report.scanned += 1;

            let job = match self.store.get_job(&id).await {
                Ok(Some(job)) => job,
                // Deleted since the id scan
                Ok(None) => continue,
                Err(error) => {
                    warn!(job_id = %id, %error, "Accrual skipped job: read failed");
                    report.failed += 1;
                    continue;
                }
            };

            let Some(accrual) = Accrual::one_second(&job) else {
                continue;
            };

            match self.store.record_accrual(&id, &accrual).await {
                Ok(true) => {
                    trace!(
                        job_id = %id,
                        time_spent = ?accrual.time_spent,
                        diagnostic_time = ?accrual.diagnostic_time,
                        "Accrued one second"
                    );
                    report.updated += 1;
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(job_id = %id, %error, "Accrual skipped job: write failed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Start the tick loop on the tokio runtime
    ///
    /// The first accrual happens one period after spawning. The loop runs
    /// until [`AccrualHandle::shutdown`] is called or the handle is dropped.
    #[must_use]
    pub fn spawn(self) -> AccrualHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            info!("Accrual engine started");
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = self.tick().await;
                        debug!(
                            scanned = report.scanned,
                            updated = report.updated,
                            failed = report.failed,
                            "Accrual tick complete"
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Accrual engine stopped");
        });

        AccrualHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Lifecycle handle for a spawned [`AccrualEngine`]
#[derive(Debug)]
pub struct AccrualHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AccrualHandle {
    /// Whether the tick loop is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the tick loop and wait for it to finish
    ///
    /// A tick already in progress completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(error) = self.task.await {
            warn!(%error, "Accrual engine task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobId, Tech};
    use crate::store::{MemoryStore, MockJobStore, StoreError};
    use chrono::Utc;
    use proptest::prelude::*;

    fn job_with_techs(quoted_hours: f64, working: usize, idle: usize) -> Job {
        let mut job = Job::new("Brake job", quoted_hours, 0);
        for i in 0..working + idle {
            let mut tech = Tech::new(format!("tech-{i}"));
            if i < working {
                tech.toggle(Utc::now());
            }
            job.techs.push(tech);
        }
        job
    }

    async fn engine_with(jobs: &[Job]) -> (AccrualEngine, MemoryStore) {
        let store = MemoryStore::new();
        for job in jobs {
            store.insert_job(job).await.unwrap();
        }
        (AccrualEngine::new(Arc::new(store.clone())), store)
    }

    async fn run_ticks(engine: &AccrualEngine, ticks: usize) {
        for _ in 0..ticks {
            engine.tick().await;
        }
    }

    #[test]
    fn test_idle_job_produces_no_accrual() {
        let job = job_with_techs(1.0, 0, 2);
        assert_eq!(Accrual::one_second(&job), None);
    }

    #[test]
    fn test_each_working_tech_adds_a_second() {
        let job = job_with_techs(1.0, 3, 1);
        let accrual = Accrual::one_second(&job).unwrap();
        assert!((accrual.time_spent.unwrap() - 3.0 / 3600.0).abs() < 1e-12);
        assert_eq!(accrual.diagnostic_time, None);
    }

    #[test]
    fn test_clamps_to_quote() {
        let mut job = job_with_techs(1.0, 2, 0);
        job.time_spent = 1.0 - 1.0 / 3600.0;
        let accrual = Accrual::one_second(&job).unwrap();
        assert_eq!(accrual.time_spent, Some(1.0));
    }

    #[test]
    fn test_at_quote_writes_nothing() {
        let mut job = job_with_techs(1.0, 2, 0);
        job.time_spent = 1.0;
        assert_eq!(Accrual::one_second(&job), None);
    }

    #[test]
    fn test_lowered_quote_never_lowers_time_spent() {
        let mut job = job_with_techs(0.5, 1, 0);
        job.time_spent = 0.75;
        assert_eq!(Accrual::one_second(&job), None);
    }

    #[test]
    fn test_diagnostic_accrues_without_techs() {
        let mut job = job_with_techs(1.0, 0, 0);
        job.diagnostic.is_running = true;
        job.diagnostic.time = 10.0;
        let accrual = Accrual::one_second(&job).unwrap();
        assert_eq!(accrual.time_spent, None);
        assert!((accrual.diagnostic_time.unwrap() - (10.0 + 1.0 / 3600.0)).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_labor_accrual_is_bounded_and_monotonic(
            quoted in 0.01f64..100.0,
            spent_seconds in 0u32..400_000,
            working in 1usize..6,
        ) {
            let mut job = job_with_techs(quoted, working, 0);
            job.time_spent = f64::from(spent_seconds) / 3600.0;
            let before = job.time_spent;

            let after = Accrual::one_second(&job)
                .and_then(|a| a.time_spent)
                .unwrap_or(before);

            prop_assert!(after >= before);
            prop_assert!(after <= quoted.max(before));
            if before < quoted {
                #[allow(clippy::cast_precision_loss)]
                let expected = (before + working as f64 / 3600.0).min(quoted);
                prop_assert!((after - expected).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_diagnostic_adds_exactly_one_second(seconds in 0u32..1_000_000) {
            let mut job = job_with_techs(1.0, 0, 0);
            job.diagnostic.is_running = true;
            job.diagnostic.time = f64::from(seconds) / 3600.0;

            let accrual = Accrual::one_second(&job).unwrap();
            prop_assert_eq!(
                accrual.diagnostic_time,
                Some(f64::from(seconds + 1) / 3600.0)
            );
        }
    }

    #[tokio::test]
    async fn test_single_tech_reaches_quote_in_one_hour() {
        let job = job_with_techs(1.0, 1, 0);
        let (engine, store) = engine_with(&[job.clone()]).await;

        run_ticks(&engine, 3600).await;
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.time_spent.to_bits(), 1.0_f64.to_bits());

        run_ticks(&engine, 10).await;
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.time_spent.to_bits(), 1.0_f64.to_bits());
    }

    #[tokio::test]
    async fn test_two_techs_accrue_double() {
        let job = job_with_techs(2.0, 2, 0);
        let (engine, store) = engine_with(&[job.clone()]).await;

        run_ticks(&engine, 1800).await;
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.time_spent.to_bits(), 1.0_f64.to_bits());
    }

    #[tokio::test]
    async fn test_two_techs_clamped_by_small_quote() {
        let job = job_with_techs(0.5, 2, 0);
        let (engine, store) = engine_with(&[job.clone()]).await;

        run_ticks(&engine, 1800).await;
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.time_spent.to_bits(), 0.5_f64.to_bits());
    }

    #[tokio::test]
    async fn test_diagnostic_runs_past_visual_cap() {
        let mut job = job_with_techs(5.0, 0, 0);
        job.diagnostic.is_running = true;
        let (engine, store) = engine_with(&[job.clone()]).await;

        run_ticks(&engine, 14_400).await;
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.diagnostic.time.to_bits(), 4.0_f64.to_bits());
        assert!((stored.time_spent - 0.0).abs() < f64::EPSILON);

        run_ticks(&engine, 3600).await;
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.diagnostic.time.to_bits(), 5.0_f64.to_bits());
    }

    #[tokio::test]
    async fn test_tick_report_counts() {
        let busy = job_with_techs(1.0, 1, 0);
        let idle = job_with_techs(1.0, 0, 1);
        let (engine, _store) = engine_with(&[busy, idle]).await;

        let report = engine.tick().await;
        assert_eq!(
            report,
            TickReport {
                scanned: 2,
                updated: 1,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_one_failing_job_does_not_stop_the_scan() {
        let good = job_with_techs(1.0, 1, 0);
        let bad_id = JobId::from("broken");
        let good_id = good.id.clone();

        let mut store = MockJobStore::new();
        let ids = vec![bad_id.clone(), good_id.clone()];
        store.expect_job_ids().returning(move || Ok(ids.clone()));
        store.expect_get_job().returning(move |id| {
            if id == &bad_id {
                Err(StoreError::Corrupt("unreadable row".to_string()))
            } else {
                Ok(Some(good.clone()))
            }
        });
        store
            .expect_record_accrual()
            .withf(move |id, accrual| id == &good_id && accrual.time_spent.is_some())
            .times(1)
            .returning(|_, _| Ok(true));

        let engine = AccrualEngine::new(Arc::new(store));
        let report = engine.tick().await;

        assert_eq!(report.scanned, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_isolated() {
        let first = job_with_techs(1.0, 1, 0);
        let second = job_with_techs(1.0, 1, 0);
        let first_id = first.id.clone();
        let jobs = [first, second];

        let mut store = MockJobStore::new();
        let ids: Vec<JobId> = jobs.iter().map(|job| job.id.clone()).collect();
        store.expect_job_ids().returning(move || Ok(ids.clone()));
        store
            .expect_get_job()
            .returning(move |id| Ok(jobs.iter().find(|job| &job.id == id).cloned()));
        store.expect_record_accrual().times(2).returning(move |id, _| {
            if id == &first_id {
                Err(StoreError::Corrupt("disk full".to_string()))
            } else {
                Ok(true)
            }
        });

        let report = AccrualEngine::new(Arc::new(store)).tick().await;
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_skips_tick() {
        let mut store = MockJobStore::new();
        store
            .expect_job_ids()
            .returning(|| Err(StoreError::Corrupt("offline".to_string())));
        store.expect_get_job().never();

        let report = AccrualEngine::new(Arc::new(store)).tick().await;
        assert_eq!(report, TickReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_engine_ticks_every_second() {
        let job = job_with_techs(1.0, 1, 0);
        let (engine, store) = engine_with(&[job.clone()]).await;

        let handle = engine.spawn();
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert!(handle.is_running());
        handle.shutdown().await;

        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.time_spent.to_bits(), (5.0_f64 / 3600.0).to_bits());

        // No ticks after shutdown
        tokio::time::sleep(Duration::from_secs(3)).await;
        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.time_spent.to_bits(), (5.0_f64 / 3600.0).to_bits());
    }
}
