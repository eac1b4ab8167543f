//! HTTP handlers
//!
//! Thin adapters from axum extractors to [`JobService`](crate::service::JobService)
//! calls. Errors render through [`ShopError`](crate::error::ShopError).

pub mod jobs;
