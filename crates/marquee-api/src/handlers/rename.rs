// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use marquee_application::{AppState, RenamePreview};
use marquee_domain::{MovieId, StudioId};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::error::{parse_id, ApiError, ApiResult};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RenameQuery {
    pub movie_id: Option<String>,
    pub studio_id: Option<String>,
    pub year: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(get_rename_previews))
}

/// Files whose current path differs from the one the naming config builds
#[utoipa::path(
    get,
    path = "/api/v1/rename",
    params(RenameQuery),
    responses(
        (status = 200, description = "Rename previews", body = Vec<Value>),
        (status = 400, description = "Neither movieId nor studioId given", body = crate::error::ErrorResponse)
    ),
    tag = "rename"
)]
pub async fn get_rename_previews(
    State(state): State<AppState>,
    Query(query): Query<RenameQuery>,
) -> ApiResult<Json<Vec<RenamePreview>>> {
    let previews = match (query.movie_id, query.studio_id) {
        (Some(movie_id), _) => {
            let id = parse_id(&movie_id, MovieId::parse)?;
            state.rename.get_rename_previews(&[id]).await?
        }
        (None, Some(studio_id)) => {
            let id = parse_id(&studio_id, StudioId::parse)?;
            state
                .rename
                .get_rename_previews_for_studio(id, query.year)
                .await?
        }
        (None, None) => return Err(ApiError::bad_request("movieId or studioId is required")),
    };
    Ok(Json(previews))
}
