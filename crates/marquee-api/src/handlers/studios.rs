// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use marquee_application::library::{ListQuery, Listing, StudioUpdate};
use marquee_application::AppState;
use marquee_domain::{Studio, StudioId};
use serde_json::Value;

use crate::error::{parse_id, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_studios))
        .route("/:id", get(get_studio).put(update_studio))
}

#[utoipa::path(
    get,
    path = "/api/v1/studios",
    params(
        ("sortKey" = Option<String>, Query, description = "sortTitle, network or added"),
        ("sortDirection" = Option<String>, Query, description = "ascending or descending"),
        ("filterKey" = Option<String>, Query, description = "Filter key")
    ),
    responses((status = 200, description = "Studio listing", body = Value)),
    tag = "studios"
)]
pub async fn list_studios(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Listing<Studio>>> {
    Ok(Json(state.studios.list(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/studios/{id}",
    params(("id" = String, Path, description = "Studio id")),
    responses(
        (status = 200, description = "Studio found", body = Value),
        (status = 404, description = "Studio not found", body = crate::error::ErrorResponse)
    ),
    tag = "studios"
)]
pub async fn get_studio(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Studio>> {
    let id = parse_id(&id, StudioId::parse)?;
    Ok(Json(state.studios.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/studios/{id}",
    params(("id" = String, Path, description = "Studio id")),
    request_body = Value,
    responses((status = 200, description = "Studio updated", body = Value)),
    tag = "studios"
)]
pub async fn update_studio(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StudioUpdate>,
) -> ApiResult<Json<Studio>> {
    let id = parse_id(&id, StudioId::parse)?;
    Ok(Json(state.studios.update(id, update).await?))
}
