use axum::{
    extract::{Path, Query},
    Json,
};
use uuid::Uuid;

use crate::database::models::PollOption;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::messages::{
    self, MessageView, ReactionArgs, ReactionToggled, SendMessageArgs, UpdateMessageArgs, VoteArgs,
};
use crate::services::RequestContext;
use crate::types::{Created, Page, PaginationQuery};

/// GET /api/teams/:team/channels/:channel/messages?numItems=&cursor=
pub async fn list(
    ctx: RequestContext,
    Path((team_id, channel_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Page<MessageView>> {
    let request = ctx.page_request(query);
    Ok(ApiResponse::success(messages::list_messages(&ctx, team_id, channel_id, &request).await?))
}

/// POST /api/teams/:team/channels/:channel/messages
pub async fn send(
    ctx: RequestContext,
    Path((team_id, channel_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<SendMessageArgs>,
) -> ApiResult<Created> {
    let id = messages::send_message(&ctx, team_id, channel_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// GET /api/teams/:team/messages/:message/replies
pub async fn replies(
    ctx: RequestContext,
    Path((team_id, message_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<MessageView>> {
    Ok(ApiResponse::success(messages::list_replies(&ctx, team_id, message_id).await?))
}

/// PATCH /api/teams/:team/messages/:message
pub async fn update(
    ctx: RequestContext,
    Path((team_id, message_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<UpdateMessageArgs>,
) -> ApiResult<()> {
    messages::update_message(&ctx, team_id, message_id, args).await?;
    Ok(ApiResponse::empty())
}

/// DELETE /api/teams/:team/messages/:message
pub async fn remove(ctx: RequestContext, Path((team_id, message_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    messages::delete_message(&ctx, team_id, message_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/teams/:team/messages/:message/votes
pub async fn vote(
    ctx: RequestContext,
    Path((team_id, message_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<VoteArgs>,
) -> ApiResult<Vec<PollOption>> {
    Ok(ApiResponse::success(messages::vote_poll(&ctx, team_id, message_id, args).await?))
}

/// POST /api/teams/:team/messages/:message/reactions
pub async fn react(
    ctx: RequestContext,
    Path((team_id, message_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<ReactionArgs>,
) -> ApiResult<ReactionToggled> {
    Ok(ApiResponse::success(messages::toggle_reaction(&ctx, team_id, message_id, args).await?))
}
