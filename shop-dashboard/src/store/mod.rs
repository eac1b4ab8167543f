//! Persistent job store
//!
//! A single [`JobStore`] is the source of truth for jobs and techs. It is
//! injected into both the accrual engine and the mutation service.
//!
//! Every write method touches only the fields its caller owns, so an accrual
//! write racing a toggle (or a quote edit) never clobbers the other:
//!
//! | Writer | Fields |
//! |---|---|
//! | accrual engine | `time_spent`, `diagnostic.time` |
//! | tech toggle | `is_working`, `start_time` |
//! | diagnostic toggle | `diagnostic.is_running` |
//! | job update | `title`, `quoted_hours` |
//! | reorder | `order` |
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, lost on restart
//! - [`SqliteStore`] - SQLite database through a `sqlx` pool

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::accrual::Accrual;
use crate::config::{StoreBackend, StoreSettings};
use crate::model::{Job, JobId, Tech, TechId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Edits to the user-editable job fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobChanges {
    /// New title, if changing
    pub title: Option<String>,
    /// New quote in hours, if changing
    pub quoted_hours: Option<f64>,
}

impl JobChanges {
    /// Whether no field is being changed
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.quoted_hours.is_none()
    }
}

/// Storage backend for jobs and their techs
///
/// Methods returning `bool` report whether the addressed record existed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Check that the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// All jobs sorted by `order`, ties broken by id
    async fn list_jobs(&self) -> StoreResult<Vec<Job>>;

    /// Identifiers of every job, in no particular order
    async fn job_ids(&self) -> StoreResult<Vec<JobId>>;

    /// Fetch a single job with its techs
    async fn get_job(&self, id: &JobId) -> StoreResult<Option<Job>>;

    /// Number of jobs currently stored
    async fn count_jobs(&self) -> StoreResult<usize>;

    /// Insert a new job together with any techs it carries
    async fn insert_job(&self, job: &Job) -> StoreResult<()>;

    /// Apply title/quote edits
    async fn update_job(&self, id: &JobId, changes: &JobChanges) -> StoreResult<bool>;

    /// Delete a job and, with it, all of its techs
    async fn delete_job(&self, id: &JobId) -> StoreResult<bool>;

    /// Append a tech to a job
    async fn insert_tech(&self, job_id: &JobId, tech: &Tech) -> StoreResult<bool>;

    /// Flip a tech between stopped and working, stamping `at` on start
    async fn toggle_tech(
        &self,
        job_id: &JobId,
        tech_id: &TechId,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Flip a job's diagnostic timer
    async fn toggle_diagnostic(&self, job_id: &JobId) -> StoreResult<bool>;

    /// Set the display rank of each listed job; returns how many existed
    async fn set_orders(&self, ranks: &[(JobId, u32)]) -> StoreResult<usize>;

    /// Write the accrual-owned time fields of a job
    ///
    /// Labor time is clamped to the quote stored at write time, unless it
    /// already sits above that quote, in which case it is left unchanged.
    async fn record_accrual(&self, id: &JobId, accrual: &Accrual) -> StoreResult<bool>;
}

/// Open the backend selected in configuration
///
/// # Errors
///
/// Returns an error if the SQLite database cannot be opened or its tables
/// cannot be created.
pub async fn open(settings: &StoreSettings) -> StoreResult<Arc<dyn JobStore>> {
    match settings.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory job store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            tracing::info!(url = %settings.url, "Using SQLite job store");
            let store = SqliteStore::connect(&settings.url, settings.max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_changes_is_empty() {
        assert!(JobChanges::default().is_empty());
        assert!(!JobChanges {
            title: Some("Rotors".to_string()),
            quoted_hours: None,
        }
        .is_empty());
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let settings = StoreSettings::default();
        assert_eq!(settings.backend, StoreBackend::Memory);

        let store = open(&settings).await.unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.count_jobs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_sqlite_backend() {
        let settings = StoreSettings {
            backend: StoreBackend::Sqlite,
            url: "sqlite::memory:".to_string(),
            max_connections: 4,
        };

        let store = open(&settings).await.unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.count_jobs().await.unwrap(), 0);
    }
}
