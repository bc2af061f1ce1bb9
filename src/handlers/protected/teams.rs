use axum::{extract::Path, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::teams::{self, CreateTeamArgs, JoinTeamArgs, TeamSummary, UpdateTeamArgs};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams - Teams the caller belongs to
pub async fn list(ctx: RequestContext) -> ApiResult<Vec<TeamSummary>> {
    Ok(ApiResponse::success(teams::list_teams(&ctx).await?))
}

/// POST /api/teams - Create a team owned by the caller
pub async fn create(ctx: RequestContext, Json(args): Json<CreateTeamArgs>) -> ApiResult<Created> {
    let id = teams::create_team(&ctx, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// GET /api/teams/:team
pub async fn get(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<TeamSummary> {
    Ok(ApiResponse::success(teams::get_team(&ctx, team_id).await?))
}

/// PATCH /api/teams/:team
pub async fn update(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<UpdateTeamArgs>,
) -> ApiResult<()> {
    teams::update_team(&ctx, team_id, args).await?;
    Ok(ApiResponse::empty())
}

/// DELETE /api/teams/:team
pub async fn remove(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<()> {
    teams::delete_team(&ctx, team_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/teams/:team/join-code - Issue a new invitation code
pub async fn join_code_post(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Value> {
    let code = teams::regenerate_join_code(&ctx, team_id).await?;
    Ok(ApiResponse::success(json!({ "joinCode": code })))
}

/// DELETE /api/teams/:team/join-code
pub async fn join_code_delete(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<()> {
    teams::disable_join_code(&ctx, team_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/teams/join - Join by invitation code
pub async fn join(ctx: RequestContext, Json(args): Json<JoinTeamArgs>) -> ApiResult<Created> {
    let id = teams::join_team(&ctx, args).await?;
    Ok(ApiResponse::success(Created { id }))
}

/// POST /api/teams/:team/leave
pub async fn leave(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<()> {
    teams::leave_team(&ctx, team_id).await?;
    Ok(ApiResponse::empty())
}
