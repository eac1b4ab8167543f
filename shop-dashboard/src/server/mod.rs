//! HTTP server assembly and lifecycle
//!
//! [`router`] builds the full axum application for a given state, which is
//! what the integration tests drive. [`run`] wires configuration, store,
//! accrual engine and listener together for the binary.

use crate::accrual::AccrualEngine;
use crate::config::{ServerSettings, ShopConfig};
use crate::handlers::jobs;
use crate::health;
use crate::state::AppState;
use crate::store;
use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let server = &state.config().server;
    let cors = server.cors_permissive.then(CorsLayer::permissive);
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(timeout_layer(server))
        .option_layer(cors);

    Router::new()
        .route("/api/jobs", get(jobs::list).post(jobs::create))
        .route("/api/jobs/reorder", post(jobs::reorder))
        .route(
            "/api/jobs/{id}",
            get(jobs::show).put(jobs::update).delete(jobs::delete),
        )
        .route("/api/jobs/{id}/complete", post(jobs::complete))
        .route("/api/jobs/{id}/techs", post(jobs::add_tech))
        .route(
            "/api/jobs/{id}/techs/{tech_id}/toggle",
            put(jobs::toggle_tech),
        )
        .route(
            "/api/jobs/{id}/diagnostic/toggle",
            put(jobs::toggle_diagnostic),
        )
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .layer(middleware)
        .with_state(state)
}

/// Requests running past the configured timeout answer 408
fn timeout_layer(server: &ServerSettings) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, server.request_timeout())
}

/// Run the service until Ctrl-C
///
/// After the listener has drained, pending job completions are awaited and
/// the accrual engine is stopped.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the address cannot be
/// bound, or the server fails while running.
pub async fn run(config: ShopConfig) -> anyhow::Result<()> {
    let store = store::open(&config.store).await?;

    let engine = config
        .accrual
        .enabled
        .then(|| AccrualEngine::new(store.clone()).spawn());
    if engine.is_none() {
        info!("Accrual engine disabled by configuration");
    }

    let addr = config.server.bind_address();
    let state = AppState::new(config, store);
    let service = state.jobs().clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Shop dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.drain().await;
    if let Some(engine) = engine {
        engine.shutdown().await;
    }
    info!("Shop dashboard stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out() {
        let settings = ServerSettings {
            request_timeout_ms: 100,
            ..ServerSettings::default()
        };
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(&settings));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_router_serves_api() {
        let state = AppState::new(ShopConfig::default(), Arc::new(MemoryStore::new()));
        let response = router(state)
            .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
