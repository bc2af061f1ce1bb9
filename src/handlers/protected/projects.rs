use axum::{
    extract::{Path, Query},
    Json,
};
use uuid::Uuid;

use crate::database::models::Task;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::projects::{self, CreateProjectArgs, ProjectMemberView, ProjectView, UpdateProjectArgs};
use crate::services::tasks::{self, TaskFilters};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams/:team/projects
pub async fn list(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Vec<ProjectView>> {
    Ok(ApiResponse::success(projects::list_projects(&ctx, team_id).await?))
}

/// GET /api/teams/:team/projects/:project
pub async fn get(ctx: RequestContext, Path((team_id, project_id)): Path<(Uuid, Uuid)>) -> ApiResult<ProjectView> {
    Ok(ApiResponse::success(projects::get_project(&ctx, team_id, project_id).await?))
}

/// POST /api/teams/:team/projects
pub async fn create(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<CreateProjectArgs>,
) -> ApiResult<Created> {
    let id = projects::create_project(&ctx, team_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// PATCH /api/teams/:team/projects/:project
pub async fn update(
    ctx: RequestContext,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<UpdateProjectArgs>,
) -> ApiResult<()> {
    projects::update_project(&ctx, team_id, project_id, args).await?;
    Ok(ApiResponse::empty())
}

/// DELETE /api/teams/:team/projects/:project
pub async fn remove(ctx: RequestContext, Path((team_id, project_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    projects::delete_project(&ctx, team_id, project_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/teams/:team/projects/:project/join
pub async fn join(ctx: RequestContext, Path((team_id, project_id)): Path<(Uuid, Uuid)>) -> ApiResult<Created> {
    let id = projects::join_project(&ctx, team_id, project_id).await?;
    Ok(ApiResponse::success(Created { id }))
}

/// POST /api/teams/:team/projects/:project/leave
pub async fn leave(ctx: RequestContext, Path((team_id, project_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    projects::leave_project(&ctx, team_id, project_id).await?;
    Ok(ApiResponse::empty())
}

/// GET /api/teams/:team/projects/:project/members
pub async fn members(
    ctx: RequestContext,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<ProjectMemberView>> {
    Ok(ApiResponse::success(projects::list_project_members(&ctx, team_id, project_id).await?))
}

/// GET /api/teams/:team/projects/:project/tasks?status=&priority=&label=
pub async fn tasks(
    ctx: RequestContext,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
    Query(filters): Query<TaskFilters>,
) -> ApiResult<Vec<Stored<Task>>> {
    Ok(ApiResponse::success(tasks::list_project_tasks(&ctx, team_id, project_id, &filters).await?))
}
