// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use marquee_application::AppState;
use marquee_domain::{Backup, BackupType};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiResult;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub fn backup_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_backups).post(create_backup))
        .route("/:name", delete(delete_backup))
}

#[utoipa::path(
    get,
    path = "/api/v1/system/backup",
    responses((status = 200, description = "Backups, newest first", body = Vec<Value>)),
    tag = "system"
)]
pub async fn list_backups(State(state): State<AppState>) -> ApiResult<Json<Vec<Backup>>> {
    Ok(Json(state.backups.list().await?))
}

/// Writes a manual backup of the database right away
#[utoipa::path(
    post,
    path = "/api/v1/system/backup",
    responses((status = 201, description = "Backup created", body = Value)),
    tag = "system"
)]
pub async fn create_backup(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<Backup>)> {
    let backup = state.backups.create(BackupType::Manual).await?;
    Ok((StatusCode::CREATED, Json(backup)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/system/backup/{name}",
    params(("name" = String, Path, description = "Backup file name")),
    responses(
        (status = 204, description = "Backup deleted"),
        (status = 404, description = "Backup not found", body = crate::error::ErrorResponse)
    ),
    tag = "system"
)]
pub async fn delete_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.backups.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
