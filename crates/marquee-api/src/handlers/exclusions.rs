// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use marquee_application::AppState;
use marquee_domain::{ExclusionId, ImportExclusion};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{parse_id, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExclusionRequest {
    pub tmdb_id: i32,
    pub title: String,
    pub year: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exclusions).post(create_exclusion))
        .route("/:id", delete(delete_exclusion))
}

#[utoipa::path(
    get,
    path = "/api/v1/exclusions",
    responses((status = 200, description = "Movies list imports must skip", body = Vec<Value>)),
    tag = "exclusions"
)]
pub async fn list_exclusions(State(state): State<AppState>) -> ApiResult<Json<Vec<ImportExclusion>>> {
    Ok(Json(state.lookup.exclusions().await?))
}

/// An already excluded TMDB id returns the stored exclusion
#[utoipa::path(
    post,
    path = "/api/v1/exclusions",
    request_body = Value,
    responses(
        (status = 201, description = "Exclusion stored", body = Value),
        (status = 400, description = "Missing title or TMDB id", body = crate::error::ErrorResponse)
    ),
    tag = "exclusions"
)]
pub async fn create_exclusion(
    State(state): State<AppState>,
    Json(request): Json<CreateExclusionRequest>,
) -> ApiResult<(StatusCode, Json<ImportExclusion>)> {
    let exclusion = ImportExclusion::new(request.tmdb_id, request.title, request.year);
    let stored = state.lookup.add_exclusion(exclusion).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/exclusions/{id}",
    params(("id" = String, Path, description = "Exclusion id")),
    responses(
        (status = 204, description = "Exclusion removed"),
        (status = 404, description = "Exclusion not found", body = crate::error::ErrorResponse)
    ),
    tag = "exclusions"
)]
pub async fn delete_exclusion(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&id, ExclusionId::parse)?;
    state.lookup.delete_exclusion(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
