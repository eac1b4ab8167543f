//! SQLite job store backed by a `sqlx` pool

use super::{JobChanges, JobStore, StoreError, StoreResult};
use crate::accrual::Accrual;
use crate::model::{Diagnostic, Job, JobId, Tech, TechId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        quoted_hours REAL NOT NULL,
        time_spent REAL NOT NULL DEFAULT 0,
        diagnostic_time REAL NOT NULL DEFAULT 0,
        diagnostic_running INTEGER NOT NULL DEFAULT 0,
        position INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS techs (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL,
        job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        is_working INTEGER NOT NULL DEFAULT 0,
        start_time INTEGER,
        UNIQUE (job_id, id)
    )",
];

const JOB_COLUMNS: &str =
    "id, title, quoted_hours, time_spent, diagnostic_time, diagnostic_running, position";

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    title: String,
    quoted_hours: f64,
    time_spent: f64,
    diagnostic_time: f64,
    diagnostic_running: bool,
    position: i64,
}

#[derive(sqlx::FromRow)]
struct TechRow {
    job_id: String,
    id: String,
    name: String,
    is_working: bool,
    start_time: Option<i64>,
}

impl JobRow {
    fn into_job(self, techs: Vec<Tech>) -> StoreResult<Job> {
        let order = u32::try_from(self.position).map_err(|_| {
            StoreError::Corrupt(format!("job {} has invalid position {}", self.id, self.position))
        })?;

        Ok(Job {
            id: JobId::from(self.id),
            title: self.title,
            quoted_hours: self.quoted_hours,
            time_spent: self.time_spent,
            diagnostic: Diagnostic {
                time: self.diagnostic_time,
                is_running: self.diagnostic_running,
            },
            order,
            techs,
        })
    }
}

impl TechRow {
    fn into_tech(self) -> StoreResult<Tech> {
        let start_time = self
            .start_time
            .map(|millis| {
                DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                    StoreError::Corrupt(format!("tech {} has invalid start time {millis}", self.id))
                })
            })
            .transpose()?;

        Ok(Tech {
            id: TechId::from(self.id),
            name: self.name,
            is_working: self.is_working,
            start_time,
        })
    }
}

/// Job store persisted in SQLite
///
/// Tables are created on connect if they do not exist.
///
/// # Example
///
/// ```rust,no_run
/// use shop_dashboard::store::{JobStore, SqliteStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = SqliteStore::connect("sqlite://shop.db", 5).await?;
/// let jobs = store.list_jobs().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database at `url`, creating the file if missing
    ///
    /// In-memory databases are limited to a single connection, since each
    /// SQLite connection would otherwise open its own empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened,
    /// or the schema cannot be created.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating tables if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    async fn techs_for(&self, job_id: &str) -> StoreResult<Vec<Tech>> {
        sqlx::query_as::<_, TechRow>(
            "SELECT job_id, id, name, is_working, start_time FROM techs WHERE job_id = ?1 ORDER BY seq",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TechRow::into_tech)
        .collect()
    }

    async fn job_exists(&self, id: &JobId) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM jobs WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY position, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let tech_rows = sqlx::query_as::<_, TechRow>(
            "SELECT job_id, id, name, is_working, start_time FROM techs ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut techs: HashMap<String, Vec<Tech>> = HashMap::new();
        for row in tech_rows {
            let job_id = row.job_id.clone();
            techs.entry(job_id).or_default().push(row.into_tech()?);
        }

        rows.into_iter()
            .map(|row| {
                let job_techs = techs.remove(&row.id).unwrap_or_default();
                row.into_job(job_techs)
            })
            .collect()
    }

    async fn job_ids(&self) -> StoreResult<Vec<JobId>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM jobs")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(JobId::from).collect())
    }

    async fn get_job(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let techs = self.techs_for(&row.id).await?;
                row.into_job(techs).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn count_jobs(&self) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        usize::try_from(count).map_err(|_| StoreError::Corrupt(format!("job count {count}")))
    }

    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ))
        .bind(job.id.as_str())
        .bind(&job.title)
        .bind(job.quoted_hours)
        .bind(job.time_spent)
        .bind(job.diagnostic.time)
        .bind(job.diagnostic.is_running)
        .bind(i64::from(job.order))
        .execute(&mut *tx)
        .await?;

        for tech in &job.techs {
            sqlx::query(
                "INSERT INTO techs (id, job_id, name, is_working, start_time) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(tech.id.as_str())
            .bind(job.id.as_str())
            .bind(&tech.name)
            .bind(tech.is_working)
            .bind(tech.start_time.map(|at| at.timestamp_millis()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_job(&self, id: &JobId, changes: &JobChanges) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET title = COALESCE(?1, title), quoted_hours = COALESCE(?2, quoted_hours) WHERE id = ?3",
        )
        .bind(changes.title.as_deref())
        .bind(changes.quoted_hours)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_job(&self, id: &JobId) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM techs WHERE job_id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_tech(&self, job_id: &JobId, tech: &Tech) -> StoreResult<bool> {
        if !self.job_exists(job_id).await? {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO techs (id, job_id, name, is_working, start_time) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(tech.id.as_str())
        .bind(job_id.as_str())
        .bind(&tech.name)
        .bind(tech.is_working)
        .bind(tech.start_time.map(|at| at.timestamp_millis()))
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn toggle_tech(
        &self,
        job_id: &JobId,
        tech_id: &TechId,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // Right-hand sides see the pre-update row, so `is_working` is the old value
        let result = sqlx::query(
            "UPDATE techs
             SET is_working = NOT is_working,
                 start_time = CASE WHEN is_working THEN NULL ELSE ?1 END
             WHERE job_id = ?2 AND id = ?3",
        )
        .bind(at.timestamp_millis())
        .bind(job_id.as_str())
        .bind(tech_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_diagnostic(&self, job_id: &JobId) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE jobs SET diagnostic_running = NOT diagnostic_running WHERE id = ?1")
                .bind(job_id.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_orders(&self, ranks: &[(JobId, u32)]) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for (id, order) in ranks {
            let result = sqlx::query("UPDATE jobs SET position = ?1 WHERE id = ?2")
                .bind(i64::from(*order))
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                updated += 1;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn record_accrual(&self, id: &JobId, accrual: &Accrual) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs
             SET time_spent = CASE
                     WHEN ?1 IS NULL THEN time_spent
                     ELSE MIN(?1, MAX(quoted_hours, time_spent))
                 END,
                 diagnostic_time = COALESCE(?2, diagnostic_time)
             WHERE id = ?3",
        )
        .bind(accrual.time_spent)
        .bind(accrual.diagnostic_time)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
