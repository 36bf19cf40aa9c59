/// Task endpoints
///
/// Tasks are always scoped to the caller. A task id that belongs to another
/// user is answered exactly like a missing one (404).
///
/// # Endpoints
///
/// - `GET    /api/tasks` - List own tasks, newest first
/// - `POST   /api/tasks` - Create a task
/// - `PATCH  /api/tasks/:id` - Toggle completion (empty body) or partial update
/// - `DELETE /api/tasks/:id` - Remove a task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{not_blank, ValidJson},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskdash_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTask, Task, TaskPriority, UpdateTask, DEFAULT_DUE},
};
use uuid::Uuid;
use validator::Validate;

use super::auth::MessageResponse;

const TASK_NOT_FOUND: &str = "Task not found";
const NOTHING_TO_UPDATE: &str = "No fields to update";

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(
        custom(function = "not_blank", message = "Title is required"),
        length(max = 255, message = "Title must be at most 255 characters")
    )]
    pub title: String,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[validate(length(max = 64, message = "Due must be at most 64 characters"))]
    pub due: Option<String>,
}

/// Partial update request; every field optional
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskRequest {
    #[validate(
        custom(function = "not_blank", message = "Title cannot be blank"),
        length(max = 255, message = "Title must be at most 255 characters")
    )]
    pub title: Option<String>,

    pub priority: Option<TaskPriority>,

    #[validate(length(max = 64, message = "Due must be at most 64 characters"))]
    pub due: Option<String>,

    pub completed: Option<bool>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title.map(|t| t.trim().to_string()),
            priority: req.priority,
            due: req.due.map(|d| d.trim().to_string()),
            completed: req.completed,
        }
    }
}

/// Parses a PATCH body: `None` for an absent body or `{}`, meaning "toggle"
///
/// A body whose fields are all `null` is rejected rather than toggling.
fn parse_patch_body(body: &[u8]) -> ApiResult<Option<UpdateTask>> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    if value.as_object().map_or(false, |fields| fields.is_empty()) {
        return Ok(None);
    }

    let req: UpdateTaskRequest = serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    req.validate()?;

    let update = UpdateTask::from(req);
    if update.is_empty() {
        return Err(ApiError::BadRequest(NOTHING_TO_UPDATE.to_string()));
    }

    Ok(Some(update))
}

/// List the caller's tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(tasks))
}

/// Create a task
///
/// ```text
/// POST /api/tasks
/// { "title": "Write report", "priority": "High", "due": "Tomorrow" }
/// ```
///
/// `priority` defaults to `Medium` and `due` to `Today`.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let due = req
        .due
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_DUE.to_string());

    let task = Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            title: req.title.trim().to_string(),
            priority: req.priority.unwrap_or_default(),
            due,
        },
    )
    .await?;

    tracing::debug!(user_id = %auth.user_id, task_id = %task.id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Toggle or update a task
///
/// ```text
/// PATCH /api/tasks/:id              (no body: flip `completed`)
/// PATCH /api/tasks/:id
/// { "title": "Renamed", "priority": "Low" }
/// ```
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<Task>> {
    let task = match parse_patch_body(&body)? {
        None => Task::toggle_completed(&state.db, id, auth.user_id).await?,
        Some(update) => Task::update_owned(&state.db, id, auth.user_id, update).await?,
    };

    task.map(Json)
        .ok_or_else(|| ApiError::NotFound(TASK_NOT_FOUND.to_string()))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if !Task::delete_owned(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound(TASK_NOT_FOUND.to_string()));
    }

    tracing::debug!(user_id = %auth.user_id, task_id = %id, "Task removed");

    Ok(MessageResponse::new("Task removed"))
}
