// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use marquee_application::library::{CustomQuery, ListQuery, Listing, MovieUpdate};
use marquee_application::{
    AddMovieRequest, AppState, MovieBulkDelete, MovieBulkUpdate, MovieLookupResource,
};
use marquee_domain::{Movie, MovieId};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{parse_id, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movies).post(add_movie))
        .route("/query", post(query_movies))
        .route("/lookup", get(lookup_movies))
        .route("/editor", put(edit_movies).delete(delete_movies))
        .route("/:id", get(get_movie).put(update_movie).delete(delete_movie))
}

/// Sorted and filtered library listing with its jump bar
///
/// Parameters that are left out fall back to the stored index preferences.
#[utoipa::path(
    get,
    path = "/api/v1/movies",
    params(
        ("section" = Option<String>, Query, description = "movieIndex or sceneIndex"),
        ("sortKey" = Option<String>, Query, description = "Sort key"),
        ("sortDirection" = Option<String>, Query, description = "ascending or descending"),
        ("filterKey" = Option<String>, Query, description = "Predefined filter key or custom filter id"),
        ("itemType" = Option<String>, Query, description = "movie or scene")
    ),
    responses(
        (status = 200, description = "Listing", body = Value),
        (status = 400, description = "Unknown sort key or filter", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Listing<Movie>>> {
    debug!(target: "api", ?query, "listing movies");
    Ok(Json(state.movies.list(query).await?))
}

/// Listing filtered by caller-supplied property filters
#[utoipa::path(
    post,
    path = "/api/v1/movies/query",
    request_body = Value,
    responses((status = 200, description = "Listing", body = Value)),
    tag = "movies"
)]
pub async fn query_movies(
    State(state): State<AppState>,
    Json(query): Json<CustomQuery>,
) -> ApiResult<Json<Listing<Movie>>> {
    Ok(Json(state.movies.query(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/movies/{id}",
    params(("id" = String, Path, description = "Movie id")),
    responses(
        (status = 200, description = "Movie found", body = Value),
        (status = 404, description = "Movie not found", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn get_movie(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Movie>> {
    let id = parse_id(&id, MovieId::parse)?;
    Ok(Json(state.movies.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/movies/{id}",
    params(("id" = String, Path, description = "Movie id")),
    request_body = Value,
    responses(
        (status = 200, description = "Movie updated", body = Value),
        (status = 404, description = "Movie not found", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<MovieUpdate>,
) -> ApiResult<Json<Movie>> {
    let id = parse_id(&id, MovieId::parse)?;
    Ok(Json(state.movies.update(id, update).await?))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub term: String,
}

/// Searches the metadata source for movies to add
///
/// `tmdb:<id>` looks a single movie up by TMDB id.
#[utoipa::path(
    get,
    path = "/api/v1/movies/lookup",
    params(("term" = String, Query, description = "Title or tmdb:<id>")),
    responses(
        (status = 200, description = "Search results flagged against the library", body = Vec<Value>),
        (status = 502, description = "Metadata server failed", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn lookup_movies(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<Vec<MovieLookupResource>>> {
    Ok(Json(state.lookup.lookup(&query.term).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/movies",
    request_body = Value,
    responses(
        (status = 201, description = "Movie added and refresh queued", body = Value),
        (status = 400, description = "Already in the library or no root folder", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown TMDB id", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn add_movie(
    State(state): State<AppState>,
    Json(request): Json<AddMovieRequest>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    let movie = state.lookup.add_movie(request).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Applies one edit to every selected movie
///
/// Nothing is saved unless every movie validates. Files stay where they are
/// when the root folder changes.
#[utoipa::path(
    put,
    path = "/api/v1/movies/editor",
    request_body = Value,
    responses(
        (status = 200, description = "Edited movies", body = Vec<Value>),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown movie id", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn edit_movies(
    State(state): State<AppState>,
    Json(update): Json<MovieBulkUpdate>,
) -> ApiResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.bulk_update(update).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/movies/editor",
    request_body = Value,
    responses(
        (status = 204, description = "Movies deleted"),
        (status = 404, description = "Unknown movie id", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn delete_movies(
    State(state): State<AppState>,
    Json(request): Json<MovieBulkDelete>,
) -> ApiResult<StatusCode> {
    state.movies.bulk_delete(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMovieQuery {
    #[serde(default)]
    pub add_import_exclusion: bool,
}

#[utoipa::path(
    delete,
    path = "/api/v1/movies/{id}",
    params(
        ("id" = String, Path, description = "Movie id"),
        ("addImportExclusion" = Option<bool>, Query, description = "Keep list imports from adding it back")
    ),
    responses(
        (status = 204, description = "Movie deleted"),
        (status = 404, description = "Movie not found", body = crate::error::ErrorResponse)
    ),
    tag = "movies"
)]
pub async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteMovieQuery>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, MovieId::parse)?;
    state.movies.delete(id, query.add_import_exclusion).await?;
    Ok(StatusCode::NO_CONTENT)
}
