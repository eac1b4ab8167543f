//! Job and tech handlers
//!
//! ```text
//! GET    /api/jobs
//! POST   /api/jobs
//! POST   /api/jobs/reorder
//! GET    /api/jobs/{id}
//! PUT    /api/jobs/{id}
//! DELETE /api/jobs/{id}
//! POST   /api/jobs/{id}/complete
//! POST   /api/jobs/{id}/techs
//! PUT    /api/jobs/{id}/diagnostic/toggle
//! PUT    /api/jobs/{id}/techs/{tech_id}/toggle
//! ```

use crate::error::ShopResult;
use crate::extractors::ValidatedJson;
use crate::model::{Job, JobId, TechId};
use crate::service::{AddTech, CreateJob, Reorder, UpdateJob};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

/// `GET /api/jobs`
pub async fn list(State(state): State<AppState>) -> ShopResult<Json<Vec<Job>>> {
    Ok(Json(state.jobs().list_jobs().await?))
}

/// `POST /api/jobs`
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateJob>,
) -> ShopResult<Json<Job>> {
    Ok(Json(state.jobs().create_job(request).await?))
}

/// `GET /api/jobs/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> ShopResult<Json<Job>> {
    Ok(Json(state.jobs().get_job(&id).await?))
}

/// `PUT /api/jobs/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    ValidatedJson(request): ValidatedJson<UpdateJob>,
) -> ShopResult<Json<Job>> {
    Ok(Json(state.jobs().update_job(&id, request).await?))
}

/// `DELETE /api/jobs/{id}`
///
/// Responds `{"success": true}` whether or not the job existed.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> ShopResult<Json<Value>> {
    state.jobs().delete_job(&id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/jobs/{id}/complete`
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> ShopResult<Json<Job>> {
    Ok(Json(state.jobs().complete_job(&id).await?))
}

/// `POST /api/jobs/{id}/techs`
pub async fn add_tech(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    ValidatedJson(request): ValidatedJson<AddTech>,
) -> ShopResult<Json<Job>> {
    Ok(Json(state.jobs().add_tech(&id, request).await?))
}

/// `PUT /api/jobs/{id}/techs/{tech_id}/toggle`
pub async fn toggle_tech(
    State(state): State<AppState>,
    Path((id, tech_id)): Path<(JobId, TechId)>,
) -> ShopResult<Json<Job>> {
    Ok(Json(state.jobs().toggle_tech(&id, &tech_id).await?))
}

/// `PUT /api/jobs/{id}/diagnostic/toggle`
pub async fn toggle_diagnostic(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> ShopResult<Json<Job>> {
    Ok(Json(state.jobs().toggle_diagnostic(&id).await?))
}

/// `POST /api/jobs/reorder`
pub async fn reorder(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<Reorder>,
) -> ShopResult<Json<Vec<Job>>> {
    Ok(Json(state.jobs().reorder(request).await?))
}
