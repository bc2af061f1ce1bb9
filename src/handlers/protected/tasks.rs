use axum::{
    extract::{Path, Query},
    Json,
};
use uuid::Uuid;

use crate::database::models::Task;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tasks::{self, CreateTaskArgs, DeleteTasksArgs, TaskFilters, UpdateTaskArgs};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams/:team/tasks/mine?status=&priority=&label=
pub async fn mine(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Query(filters): Query<TaskFilters>,
) -> ApiResult<Vec<Stored<Task>>> {
    Ok(ApiResponse::success(tasks::list_my_tasks(&ctx, team_id, &filters).await?))
}

/// GET /api/teams/:team/tasks/:task/subtasks
pub async fn subtasks(
    ctx: RequestContext,
    Path((team_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Stored<Task>>> {
    Ok(ApiResponse::success(tasks::list_subtasks(&ctx, team_id, task_id).await?))
}

/// POST /api/teams/:team/tasks
pub async fn create(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<CreateTaskArgs>,
) -> ApiResult<Created> {
    let id = tasks::create_task(&ctx, team_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// PATCH /api/teams/:team/tasks/:task
pub async fn update(
    ctx: RequestContext,
    Path((team_id, task_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<UpdateTaskArgs>,
) -> ApiResult<()> {
    tasks::update_task(&ctx, team_id, task_id, args).await?;
    Ok(ApiResponse::empty())
}

/// DELETE /api/teams/:team/tasks/:task
pub async fn remove(ctx: RequestContext, Path((team_id, task_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    tasks::delete_task(&ctx, team_id, task_id).await?;
    Ok(ApiResponse::empty())
}

/// DELETE /api/teams/:team/tasks - Bulk delete, body `{ "taskIds": [...] }`
pub async fn remove_many(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<DeleteTasksArgs>,
) -> ApiResult<()> {
    tasks::delete_tasks(&ctx, team_id, args).await?;
    Ok(ApiResponse::empty())
}
