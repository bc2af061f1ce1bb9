use axum::{
    extract::{Path, Query},
    Json,
};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::channels::{
    self, AddChannelMembersArgs, ChannelMemberView, ChannelView, CreateChannelArgs, UpdateChannelArgs,
};
use crate::services::RequestContext;
use crate::types::{Created, Page, PaginationQuery};

/// GET /api/teams/:team/channels?numItems=&cursor= - All channels, paginated
pub async fn list_all(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Page<ChannelView>> {
    let request = ctx.page_request(query);
    Ok(ApiResponse::success(channels::list_all_channels(&ctx, team_id, &request).await?))
}

/// GET /api/teams/:team/channels/visible - Channels the caller can open
pub async fn list_visible(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Vec<ChannelView>> {
    Ok(ApiResponse::success(channels::list_channels(&ctx, team_id).await?))
}

/// GET /api/teams/:team/channels/:channel
pub async fn get(ctx: RequestContext, Path((team_id, channel_id)): Path<(Uuid, Uuid)>) -> ApiResult<ChannelView> {
    Ok(ApiResponse::success(channels::get_channel(&ctx, team_id, channel_id).await?))
}

/// POST /api/teams/:team/channels
pub async fn create(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<CreateChannelArgs>,
) -> ApiResult<Created> {
    let id = channels::create_channel(&ctx, team_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// PATCH /api/teams/:team/channels/:channel
pub async fn update(
    ctx: RequestContext,
    Path((team_id, channel_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<UpdateChannelArgs>,
) -> ApiResult<()> {
    channels::update_channel(&ctx, team_id, channel_id, args).await?;
    Ok(ApiResponse::empty())
}

/// DELETE /api/teams/:team/channels/:channel
pub async fn remove(ctx: RequestContext, Path((team_id, channel_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    channels::delete_channel(&ctx, team_id, channel_id).await?;
    Ok(ApiResponse::empty())
}

/// GET /api/teams/:team/channels/:channel/members
pub async fn members_get(
    ctx: RequestContext,
    Path((team_id, channel_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<ChannelMemberView>> {
    Ok(ApiResponse::success(channels::list_channel_members(&ctx, team_id, channel_id).await?))
}

/// POST /api/teams/:team/channels/:channel/members
pub async fn members_post(
    ctx: RequestContext,
    Path((team_id, channel_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<AddChannelMembersArgs>,
) -> ApiResult<Vec<Uuid>> {
    let ids = channels::add_channel_members(&ctx, team_id, channel_id, args).await?;
    Ok(ApiResponse::created(ids))
}

/// DELETE /api/teams/:team/channels/:channel/members/:channel_member
pub async fn member_delete(
    ctx: RequestContext,
    Path((team_id, channel_id, channel_member_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<()> {
    channels::remove_channel_member(&ctx, team_id, channel_id, channel_member_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/teams/:team/channels/:channel/leave
pub async fn leave(ctx: RequestContext, Path((team_id, channel_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    channels::leave_channel(&ctx, team_id, channel_id).await?;
    Ok(ApiResponse::empty())
}
