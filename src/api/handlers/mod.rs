use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;

use super::AppState;
use crate::models::*;

type ApiError = (StatusCode, String);

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    let msg = msg.into();
    tracing::warn!("Validation error: {}", msg);
    (StatusCode::BAD_REQUEST, msg)
}

fn task_not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Task not found".to_string())
}

fn require_content(content: &str) -> Result<String, ApiError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(bad_request("content must not be empty"));
    }
    Ok(content.to_string())
}

fn require_project(state: &AppState, project_id: Option<ProjectId>) -> Result<(), ApiError> {
    let Some(id) = project_id else {
        return Ok(());
    };
    if state.db.project_exists(id).map_err(internal_error)? {
        Ok(())
    } else {
        Err(bad_request(format!("project {} not found", id)))
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Tasks
// ============================================================

pub async fn list_tasks_for_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Vec<Task>>, ApiError> {
    state
        .db
        .get_tasks_by_date(date)
        .map(Json)
        .map_err(internal_error)
}

pub async fn list_inbox_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<Task>>, ApiError> {
    state.db.get_inbox_tasks().map(Json).map_err(internal_error)
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let content = require_content(&input.content)?;
    require_project(&state, input.project_id)?;

    state
        .db
        .create_task(CreateTaskInput { content, ..input })
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<Task>, ApiError> {
    let content = require_content(&input.content)?;
    require_project(&state, input.project_id)?;

    state
        .db
        .update_task(TaskId(id), UpdateTaskInput { content, ..input })
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(task_not_found)
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    state
        .db
        .toggle_task(TaskId(id))
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(task_not_found)
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_task(TaskId(id)).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(task_not_found())
    }
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ApiError> {
    state.db.get_all_projects().map(Json).map_err(internal_error)
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(bad_request("project name must not be empty"));
    }

    state
        .db
        .create_project(CreateProjectInput {
            name: name.to_string(),
            ..input
        })
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

// ============================================================
// Brain dump
// ============================================================

pub async fn process_brain_dump(
    State(state): State<AppState>,
    Json(request): Json<BrainDumpRequest>,
) -> Result<(StatusCode, Json<Vec<Task>>), ApiError> {
    if request.text.trim().is_empty() {
        return Err(bad_request("text must not be empty"));
    }

    let contents = state.decomposer.decompose(&request.text).await;
    tracing::info!(
        tasks = contents.len(),
        date = %request.task_date,
        "brain dump decomposed"
    );

    state
        .db
        .create_tasks(&contents, request.task_date)
        .map(|tasks| (StatusCode::CREATED, Json(tasks)))
        .map_err(internal_error)
}
