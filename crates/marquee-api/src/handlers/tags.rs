// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use marquee_application::AppState;
use marquee_domain::Tag;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub label: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_tags).post(create_tag))
}

#[utoipa::path(
    get,
    path = "/api/v1/tag",
    responses((status = 200, description = "All tags", body = Vec<Value>)),
    tag = "tags"
)]
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.tags.list().await?))
}

/// Labels are stored lower-cased; an existing label returns the stored tag
#[utoipa::path(
    post,
    path = "/api/v1/tag",
    request_body = Value,
    responses(
        (status = 201, description = "Tag created or found", body = Value),
        (status = 400, description = "Blank label", body = crate::error::ErrorResponse)
    ),
    tag = "tags"
)]
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let tag = state.tags.add(&request.label).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}
