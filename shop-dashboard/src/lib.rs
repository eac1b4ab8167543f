//! shop-dashboard: backend for a repair shop's live job board
//!
//! Tracks jobs, the techs working them, and per-job diagnostic timers. A
//! background accrual engine adds one second of labor per working tech (and
//! one second of diagnostic time per running timer) to every job, every
//! second, capped at the job's quote.
//!
//! # Layout
//!
//! - [`model`] - `Job`, `Tech`, `Diagnostic` and hour arithmetic
//! - [`store`] - the [`JobStore`](store::JobStore) trait with memory and SQLite backends
//! - [`accrual`] - the per-second accrual engine and its lifecycle handle
//! - [`service`] - validated job/tech mutations
//! - [`handlers`], [`server`], [`health`] - the JSON-over-HTTP surface
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shop_dashboard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     shop_dashboard::observability::init()?;
//!     let config = ShopConfig::load()?;
//!     shop_dashboard::server::run(config).await
//! }
//! ```

// Lint configuration is handled at the workspace level in Cargo.toml
#![allow(clippy::missing_errors_doc)]

pub mod accrual;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod health;
pub mod model;
pub mod observability;
pub mod server;
pub mod service;
pub mod state;
pub mod store;

pub mod prelude {
    //! Convenience re-exports for common types

    pub use crate::accrual::{AccrualEngine, AccrualHandle};
    pub use crate::config::ShopConfig;
    pub use crate::error::{ShopError, ShopResult};
    pub use crate::model::{Diagnostic, Job, JobId, Tech, TechId};
    pub use crate::service::JobService;
    pub use crate::state::AppState;
    pub use crate::store::{JobStore, MemoryStore, SqliteStore};
}
