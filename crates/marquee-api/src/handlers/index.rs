// SPDX-License-Identifier: GPL-3.0-or-later
//! Persisted view state of the movie, scene and studio index pages.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use marquee_application::index::{
    CustomFilter, Filter, FilterBuilderProp, FilterOption, IndexMode, IndexPreferences,
    IndexSection, IndexView, PropertyFilter, SortDirection, TableOptionUpdate,
};
use marquee_application::AppState;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:section", get(get_preferences))
        .route("/:section/sort", put(set_sort))
        .route("/:section/filter", put(set_filter))
        .route("/:section/view", put(set_view))
        .route("/:section/mode", put(set_mode))
        .route("/:section/table-options", put(set_table_options))
        .route("/:section/poster-options", put(set_poster_options))
        .route("/:section/overview-options", put(set_overview_options))
        .route("/:section/filters", get(list_filters).post(save_custom_filter))
        .route("/:section/filters/:id", delete(delete_custom_filter))
        .route("/:section/filter-builder", get(filter_builder))
        .route("/:section/filter-options/:prop", get(get_filter_options))
}

fn section(value: &str) -> ApiResult<IndexSection> {
    IndexSection::parse(value)
        .ok_or_else(|| ApiError::bad_request(format!("unknown index section: {value}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortRequest {
    pub sort_key: String,
    pub sort_direction: Option<SortDirection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    pub selected_filter_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub view: IndexView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeRequest {
    pub index_mode: IndexMode,
}

#[derive(Debug, Deserialize)]
pub struct CustomFilterRequest {
    #[serde(default)]
    pub id: String,
    pub label: String,
    pub filters: Vec<PropertyFilter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersResponse {
    pub predefined: Vec<Filter>,
    pub custom: Vec<CustomFilter>,
}

#[utoipa::path(
    get,
    path = "/api/v1/index/{section}",
    params(("section" = String, Path, description = "movieIndex, sceneIndex or studios")),
    responses(
        (status = 200, description = "Stored preferences or section defaults", body = Value),
        (status = 400, description = "Unknown section", body = crate::error::ErrorResponse)
    ),
    tag = "index"
)]
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<IndexPreferences>> {
    Ok(Json(state.preferences.get(section(&name)?).await?))
}

/// Repeating the current key without a direction flips the direction
#[utoipa::path(
    put,
    path = "/api/v1/index/{section}/sort",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 200, description = "Updated preferences", body = Value)),
    tag = "index"
)]
pub async fn set_sort(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SortRequest>,
) -> ApiResult<Json<IndexPreferences>> {
    let section = section(&name)?;
    Ok(Json(
        state
            .preferences
            .set_sort(section, &request.sort_key, request.sort_direction)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/index/{section}/filter",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 200, description = "Updated preferences", body = Value)),
    tag = "index"
)]
pub async fn set_filter(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<Json<IndexPreferences>> {
    let section = section(&name)?;
    Ok(Json(
        state
            .preferences
            .set_filter(section, &request.selected_filter_key)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/index/{section}/view",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 200, description = "Updated preferences", body = Value)),
    tag = "index"
)]
pub async fn set_view(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ViewRequest>,
) -> ApiResult<Json<IndexPreferences>> {
    Ok(Json(state.preferences.set_view(section(&name)?, request.view).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/index/{section}/mode",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 200, description = "Updated preferences", body = Value)),
    tag = "index"
)]
pub async fn set_mode(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ModeRequest>,
) -> ApiResult<Json<IndexPreferences>> {
    Ok(Json(
        state
            .preferences
            .set_index_mode(section(&name)?, request.index_mode)
            .await?,
    ))
}

/// Column order and visibility plus free-form table options
#[utoipa::path(
    put,
    path = "/api/v1/index/{section}/table-options",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 200, description = "Updated preferences", body = Value)),
    tag = "index"
)]
pub async fn set_table_options(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(update): Json<TableOptionUpdate>,
) -> ApiResult<Json<IndexPreferences>> {
    Ok(Json(
        state
            .preferences
            .set_table_option(section(&name)?, update)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/index/{section}/poster-options",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 200, description = "Updated preferences", body = Value)),
    tag = "index"
)]
pub async fn set_poster_options(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(options): Json<Map<String, Value>>,
) -> ApiResult<Json<IndexPreferences>> {
    Ok(Json(
        state
            .preferences
            .set_poster_option(section(&name)?, options)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/index/{section}/overview-options",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 200, description = "Updated preferences", body = Value)),
    tag = "index"
)]
pub async fn set_overview_options(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(options): Json<Map<String, Value>>,
) -> ApiResult<Json<IndexPreferences>> {
    Ok(Json(
        state
            .preferences
            .set_overview_option(section(&name)?, options)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/index/{section}/filters",
    params(("section" = String, Path, description = "Index section")),
    responses((status = 200, description = "Predefined and custom filters", body = Value)),
    tag = "index"
)]
pub async fn list_filters(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<FiltersResponse>> {
    let section = section(&name)?;
    Ok(Json(FiltersResponse {
        predefined: section.filters(),
        custom: state.preferences.custom_filters(section).await?,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/index/{section}/filters",
    params(("section" = String, Path, description = "Index section")),
    request_body = Value,
    responses((status = 201, description = "Custom filter saved", body = Value)),
    tag = "index"
)]
pub async fn save_custom_filter(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<CustomFilterRequest>,
) -> ApiResult<(StatusCode, Json<CustomFilter>)> {
    let section = section(&name)?;
    if request.label.trim().is_empty() {
        return Err(ApiError::bad_request("custom filter label is required"));
    }
    let filter = state
        .preferences
        .save_custom_filter(CustomFilter {
            id: request.id,
            section,
            label: request.label,
            filters: request.filters,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(filter)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/index/{section}/filters/{id}",
    params(
        ("section" = String, Path, description = "Index section"),
        ("id" = String, Path, description = "Custom filter id")
    ),
    responses((status = 204, description = "Custom filter deleted")),
    tag = "index"
)]
pub async fn delete_custom_filter(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    section(&name)?;
    state.preferences.delete_custom_filter(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/index/{section}/filter-builder",
    params(("section" = String, Path, description = "Index section")),
    responses((status = 200, description = "Properties a custom filter can use", body = Vec<Value>)),
    tag = "index"
)]
pub async fn filter_builder(Path(name): Path<String>) -> ApiResult<Json<Vec<FilterBuilderProp>>> {
    Ok(Json(section(&name)?.filter_builder_props()))
}

#[utoipa::path(
    get,
    path = "/api/v1/index/{section}/filter-options/{prop}",
    params(
        ("section" = String, Path, description = "Index section"),
        ("prop" = String, Path, description = "studio, collection, originalLanguage, genres or network")
    ),
    responses(
        (status = 200, description = "Distinct values, sorted by name", body = Vec<Value>),
        (status = 400, description = "Property has no options", body = crate::error::ErrorResponse)
    ),
    tag = "index"
)]
pub async fn get_filter_options(
    State(state): State<AppState>,
    Path((name, prop)): Path<(String, String)>,
) -> ApiResult<Json<Vec<FilterOption>>> {
    let options = match section(&name)? {
        IndexSection::Studios => state.studios.filter_options(&prop).await?,
        section => state.movies.filter_options(section, &prop).await?,
    };
    Ok(Json(options))
}
