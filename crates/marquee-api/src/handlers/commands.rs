// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use marquee_application::{
    AppState, Command, CommandError, CommandModel, CommandPriority, CommandTrigger,
};
use marquee_domain::CommandId;
use serde_json::Value;
use tracing::info;

use crate::error::{parse_id, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_commands).post(push_command))
        .route("/:id", get(get_command).delete(cancel_command))
}

#[utoipa::path(
    get,
    path = "/api/v1/command",
    responses((status = 200, description = "Queued, running and finished commands", body = Vec<Value>)),
    tag = "commands"
)]
pub async fn list_commands(State(state): State<AppState>) -> Json<Vec<CommandModel>> {
    Json(state.queue.all())
}

/// Queues a command; an equal command already queued or running is returned instead
#[utoipa::path(
    post,
    path = "/api/v1/command",
    request_body = Value,
    responses((status = 201, description = "Command queued", body = Value)),
    tag = "commands"
)]
pub async fn push_command(
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> (StatusCode, Json<CommandModel>) {
    let model = state
        .queue
        .push(command, CommandPriority::Normal, CommandTrigger::Manual)
        .await;
    info!(target: "api", command_id = %model.id, name = %model.name, "command requested");
    (StatusCode::CREATED, Json(model))
}

#[utoipa::path(
    get,
    path = "/api/v1/command/{id}",
    params(("id" = String, Path, description = "Command id")),
    responses(
        (status = 200, description = "Command found", body = Value),
        (status = 404, description = "Command not found", body = crate::error::ErrorResponse)
    ),
    tag = "commands"
)]
pub async fn get_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CommandModel>> {
    let id = parse_id(&id, CommandId::parse)?;
    let model = state.queue.get(id).ok_or(CommandError::NotFound(id))?;
    Ok(Json(model))
}

/// Cancels a command that has not started yet
#[utoipa::path(
    delete,
    path = "/api/v1/command/{id}",
    params(("id" = String, Path, description = "Command id")),
    responses(
        (status = 200, description = "Command cancelled", body = Value),
        (status = 409, description = "Command already started", body = crate::error::ErrorResponse)
    ),
    tag = "commands"
)]
pub async fn cancel_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CommandModel>> {
    let id = parse_id(&id, CommandId::parse)?;
    Ok(Json(state.queue.cancel(id).await?))
}
