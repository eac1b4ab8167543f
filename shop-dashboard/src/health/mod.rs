//! Health check endpoints
//!
//! - `GET /health/live` answers as long as the process is serving requests
//! - `GET /health/ready` also pings the job store and reports 503 when it is
//!   unreachable

use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ready to serve
    Healthy,
    /// Unable to serve
    Unhealthy,
}

/// Health of one dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: HealthStatus,
    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Time taken by the check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl ComponentHealth {
    /// A healthy component
    #[must_use]
    pub const fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: None,
        }
    }

    /// An unhealthy component with the reason
    #[must_use]
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    /// Attach how long the check took
    #[must_use]
    pub const fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }
}

/// Body of the readiness probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall status, unhealthy if any component is
    pub status: HealthStatus,
    /// Crate version
    pub version: String,
    /// Per-component results
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthCheckResponse {
    /// An empty, healthy response
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            version: version.into(),
            components: HashMap::new(),
        }
    }

    /// Record a component result and fold it into the overall status
    pub fn add_component(&mut self, name: impl Into<String>, health: ComponentHealth) {
        if health.status == HealthStatus::Unhealthy {
            self.status = HealthStatus::Unhealthy;
        }
        self.components.insert(name.into(), health);
    }

    /// 200 when healthy, 503 otherwise
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for HealthCheckResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

/// Liveness probe handler
#[allow(clippy::unused_async)]
pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe handler
pub async fn readiness(State(state): State<AppState>) -> HealthCheckResponse {
    let mut response = HealthCheckResponse::new(env!("CARGO_PKG_VERSION"));

    let started = Instant::now();
    let store = match state.store().ping().await {
        Ok(()) => ComponentHealth::healthy(),
        Err(error) => {
            tracing::warn!(%error, "Readiness check failed to reach store");
            ComponentHealth::unhealthy(error.to_string())
        }
    };
    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    response.add_component("store", store.with_response_time(elapsed));

    response
}
