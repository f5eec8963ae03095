// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use marquee_application::{AppState, CollectionBulkUpdate, CollectionResource};
use marquee_domain::CollectionId;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use utoipa::IntoParams;

use crate::error::{parse_id, ApiResult};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsQuery {
    pub tmdb_id: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collections).put(update_collections))
        .route("/:id", get(get_collection).put(update_collection))
}

/// All collections, or the one matching `tmdbId`
#[utoipa::path(
    get,
    path = "/api/v1/collections",
    params(CollectionsQuery),
    responses((status = 200, description = "Collections with their movies", body = Vec<Value>)),
    tag = "collections"
)]
pub async fn list_collections(
    State(state): State<AppState>,
    Query(query): Query<CollectionsQuery>,
) -> ApiResult<Json<Vec<CollectionResource>>> {
    debug!(target: "api", ?query, "listing collections");
    Ok(Json(state.collections.get_collections(query.tmdb_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/collections/{id}",
    params(("id" = String, Path, description = "Collection id")),
    responses(
        (status = 200, description = "Collection found", body = Value),
        (status = 404, description = "Collection not found", body = crate::error::ErrorResponse)
    ),
    tag = "collections"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CollectionResource>> {
    let id = parse_id(&id, CollectionId::parse)?;
    Ok(Json(state.collections.get_collection(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/collections/{id}",
    params(("id" = String, Path, description = "Collection id")),
    request_body = Value,
    responses(
        (status = 200, description = "Collection updated", body = Value),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Collection not found", body = crate::error::ErrorResponse)
    ),
    tag = "collections"
)]
pub async fn update_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(resource): Json<CollectionResource>,
) -> ApiResult<Json<CollectionResource>> {
    let id = parse_id(&id, CollectionId::parse)?;
    Ok(Json(state.collections.update_collection(id, resource).await?))
}

/// Bulk edit of monitoring, quality profile, root folder and availability
#[utoipa::path(
    put,
    path = "/api/v1/collections",
    request_body = Value,
    responses((status = 200, description = "Updated collections", body = Vec<Value>)),
    tag = "collections"
)]
pub async fn update_collections(
    State(state): State<AppState>,
    Json(bulk): Json<CollectionBulkUpdate>,
) -> ApiResult<Json<Vec<CollectionResource>>> {
    Ok(Json(state.collections.update_collections(bulk).await?))
}
