// SPDX-License-Identifier: GPL-3.0-or-later
//! One router per provider kind, mounted at `/indexer`, `/metadata`,
//! `/importlist` and `/downloadclient`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use marquee_application::providers::{
    ProviderBulkUpdate, ProviderDefinition, ProviderTemplate, ProviderTestResult,
};
use marquee_application::{AppState, ProviderKind};
use marquee_domain::ProviderId;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{parse_id, ApiResult};

pub fn routes(kind: ProviderKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_providers).post(create_provider))
        .route("/schema", get(get_schema))
        .route("/test", post(test_provider))
        .route("/testall", post(test_all_providers))
        .route("/bulk", put(bulk_update_providers).delete(bulk_delete_providers))
        .route(
            "/:id",
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .layer(Extension(kind))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<ProviderId>,
}

#[utoipa::path(
    get,
    path = "/api/v1/{kind}",
    params(("kind" = String, Path, description = "indexer, metadata, importlist or downloadclient")),
    responses((status = 200, description = "Saved definitions", body = Vec<Value>)),
    tag = "providers"
)]
pub async fn list_providers(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
) -> ApiResult<Json<Vec<ProviderDefinition>>> {
    Ok(Json(state.providers.list(kind).await?))
}

/// Templates for every implementation of the kind, with default settings
#[utoipa::path(
    get,
    path = "/api/v1/{kind}/schema",
    params(("kind" = String, Path, description = "Provider kind")),
    responses((status = 200, description = "Implementation templates", body = Vec<Value>)),
    tag = "providers"
)]
pub async fn get_schema(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
) -> Json<Vec<ProviderTemplate>> {
    Json(state.providers.schema(kind))
}

#[utoipa::path(
    get,
    path = "/api/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Provider kind"),
        ("id" = String, Path, description = "Definition id")
    ),
    responses(
        (status = 200, description = "Definition found", body = Value),
        (status = 404, description = "Definition not found", body = crate::error::ErrorResponse)
    ),
    tag = "providers"
)]
pub async fn get_provider(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProviderDefinition>> {
    let id = parse_id(&id, ProviderId::parse)?;
    Ok(Json(state.providers.get(kind, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/{kind}",
    params(("kind" = String, Path, description = "Provider kind")),
    request_body = Value,
    responses(
        (status = 201, description = "Definition created", body = Value),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse)
    ),
    tag = "providers"
)]
pub async fn create_provider(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
    Json(definition): Json<ProviderDefinition>,
) -> ApiResult<(StatusCode, Json<ProviderDefinition>)> {
    debug!(target: "api", %kind, name = %definition.name, "creating provider");
    let created = state.providers.create(kind, definition).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Provider kind"),
        ("id" = String, Path, description = "Definition id")
    ),
    request_body = Value,
    responses(
        (status = 200, description = "Definition updated", body = Value),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Definition not found", body = crate::error::ErrorResponse)
    ),
    tag = "providers"
)]
pub async fn update_provider(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
    Path(id): Path<String>,
    Json(mut definition): Json<ProviderDefinition>,
) -> ApiResult<Json<ProviderDefinition>> {
    definition.id = parse_id(&id, ProviderId::parse)?;
    Ok(Json(state.providers.update(kind, definition).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Provider kind"),
        ("id" = String, Path, description = "Definition id")
    ),
    responses(
        (status = 204, description = "Definition deleted"),
        (status = 404, description = "Definition not found", body = crate::error::ErrorResponse)
    ),
    tag = "providers"
)]
pub async fn delete_provider(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, ProviderId::parse)?;
    state.providers.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validates an unsaved definition and contacts the remote side
#[utoipa::path(
    post,
    path = "/api/v1/{kind}/test",
    params(("kind" = String, Path, description = "Provider kind")),
    request_body = Value,
    responses(
        (status = 200, description = "Test passed"),
        (status = 400, description = "Test failed", body = crate::error::ErrorResponse)
    ),
    tag = "providers"
)]
pub async fn test_provider(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
    Json(definition): Json<ProviderDefinition>,
) -> ApiResult<StatusCode> {
    state.providers.test(kind, definition).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/{kind}/testall",
    params(("kind" = String, Path, description = "Provider kind")),
    responses((status = 200, description = "Result per enabled definition", body = Vec<Value>)),
    tag = "providers"
)]
pub async fn test_all_providers(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
) -> ApiResult<Json<Vec<ProviderTestResult>>> {
    Ok(Json(state.providers.test_all(kind).await?))
}

/// Applies only the fields present in the body; no body updates nothing
#[utoipa::path(
    put,
    path = "/api/v1/{kind}/bulk",
    params(("kind" = String, Path, description = "Provider kind")),
    request_body = Value,
    responses((status = 200, description = "Updated definitions", body = Vec<Value>)),
    tag = "providers"
)]
pub async fn bulk_update_providers(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
    update: Option<Json<ProviderBulkUpdate>>,
) -> ApiResult<Json<Vec<ProviderDefinition>>> {
    let update = update.map(|Json(update)| update);
    Ok(Json(state.providers.bulk_update(kind, update).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{kind}/bulk",
    params(("kind" = String, Path, description = "Provider kind")),
    request_body = Value,
    responses((status = 204, description = "Definitions deleted")),
    tag = "providers"
)]
pub async fn bulk_delete_providers(
    State(state): State<AppState>,
    Extension(kind): Extension<ProviderKind>,
    Json(request): Json<BulkDeleteRequest>,
) -> ApiResult<StatusCode> {
    state.providers.bulk_delete(kind, &request.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
