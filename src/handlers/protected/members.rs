use axum::{extract::Path, Json};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::members::{self, MemberView, UpdateRoleArgs};
use crate::services::RequestContext;

/// GET /api/teams/:team/members
pub async fn list(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Vec<MemberView>> {
    Ok(ApiResponse::success(members::list_members(&ctx, team_id).await?))
}

/// DELETE /api/teams/:team/members/:user - Remove a user from the team
pub async fn remove(ctx: RequestContext, Path((team_id, user_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    members::delete_member(&ctx, team_id, user_id).await?;
    Ok(ApiResponse::empty())
}

/// PATCH /api/teams/:team/members/:member - Change a membership's role
pub async fn update_role(
    ctx: RequestContext,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<UpdateRoleArgs>,
) -> ApiResult<()> {
    members::update_member_role(&ctx, team_id, member_id, args).await?;
    Ok(ApiResponse::empty())
}
