use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::database::models::{Channel, ChannelMember, Message, Reaction, User};
use crate::database::{FilterData, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{find_member, is_admin, is_member, load_in_team, Membership};
use crate::services::validation::{optional_text, required_text, NAME_MAX};
use crate::services::RequestContext;
use crate::types::{Page, PageRequest};

const DEFAULT_ICON: &str = "#";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelArgs {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default = "default_allows_writing")]
    pub allows_writing: bool,
}

fn default_allows_writing() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannelArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_writing: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChannelMembersArgs {
    pub user_ids: Vec<Uuid>,
}

/// A channel annotated with whether the caller can see into it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    #[serde(flatten)]
    pub channel: Stored<Channel>,
    pub is_member: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMemberView {
    pub channel_member_id: Uuid,
    #[serde(flatten)]
    pub user: Stored<User>,
}

async fn find_channel_member(
    ctx: &RequestContext,
    channel_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Stored<ChannelMember>>, ApiError> {
    let filter = FilterData::new().eq_id("channelId", channel_id).eq_id("userId", user_id);
    Ok(ctx.repo::<ChannelMember>().select_one(filter).await?)
}

/// Load a channel the caller may read. Private channels require an explicit
/// channel membership row.
pub(crate) async fn readable_channel(
    ctx: &RequestContext,
    team_id: Uuid,
    channel_id: Uuid,
) -> Result<(Membership, Stored<Channel>), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let channel = load_in_team::<Channel>(ctx, channel_id, team_id, "Channel").await?;
    if channel.private && find_channel_member(ctx, channel.id, membership.user_id()).await?.is_none() {
        return Err(ApiError::forbidden("You are not a member of this channel."));
    }
    Ok((membership, channel))
}

async fn joined_channel_ids(ctx: &RequestContext, team_id: Uuid, user_id: Uuid) -> Result<HashSet<Uuid>, ApiError> {
    let rows = ctx
        .repo::<ChannelMember>()
        .select_any(FilterData::new().eq_id("teamId", team_id).eq_id("userId", user_id))
        .await?;
    Ok(rows.into_iter().map(|row| row.channel_id).collect())
}

/// Every channel of the team, newest first, flagged with `isMember`.
pub async fn list_all_channels(
    ctx: &RequestContext,
    team_id: Uuid,
    request: &PageRequest,
) -> Result<Page<ChannelView>, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let joined = joined_channel_ids(ctx, team_id, membership.user_id()).await?;

    let page = ctx
        .repo::<Channel>()
        .paginate(FilterData::new().eq_id("teamId", team_id).desc(), request)
        .await?;

    Ok(page.map(|channel| ChannelView {
        is_member: !channel.private || joined.contains(&channel.id),
        channel,
    }))
}

/// Channels visible to the caller: public ones and private ones they joined.
pub async fn list_channels(ctx: &RequestContext, team_id: Uuid) -> Result<Vec<ChannelView>, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let joined = joined_channel_ids(ctx, team_id, membership.user_id()).await?;

    let channels = ctx
        .repo::<Channel>()
        .select_any(FilterData::new().eq_id("teamId", team_id).desc())
        .await?;

    Ok(channels
        .into_iter()
        .filter(|channel| !channel.private || joined.contains(&channel.id))
        .map(|channel| ChannelView { channel, is_member: true })
        .collect())
}

pub async fn get_channel(ctx: &RequestContext, team_id: Uuid, channel_id: Uuid) -> Result<ChannelView, ApiError> {
    let (membership, channel) = readable_channel(ctx, team_id, channel_id).await?;
    let is_member = !channel.private || find_channel_member(ctx, channel.id, membership.user_id()).await?.is_some();
    Ok(ChannelView { channel, is_member })
}

pub async fn create_channel(ctx: &RequestContext, team_id: Uuid, args: CreateChannelArgs) -> Result<Uuid, ApiError> {
    let admin = is_admin(ctx, team_id).await?;
    let name = required_text("name", &args.name, NAME_MAX)?;
    let icon = optional_text("icon", args.icon.as_deref(), NAME_MAX)?.unwrap_or_else(|| DEFAULT_ICON.to_string());

    let mut batch = WriteBatch::new();
    let channel_id = batch.insert(&Channel {
        name,
        icon,
        allows_writing: args.allows_writing,
        private: args.private,
        team_id,
    })?;
    if args.private {
        batch.insert(&ChannelMember {
            user_id: admin.user_id(),
            channel_id,
            team_id,
        })?;
    }
    batch.commit(ctx.store()).await?;

    tracing::info!("User {} created channel {} in team {}", admin.user_id(), channel_id, team_id);
    Ok(channel_id)
}

pub async fn update_channel(
    ctx: &RequestContext,
    team_id: Uuid,
    channel_id: Uuid,
    args: UpdateChannelArgs,
) -> Result<(), ApiError> {
    let admin = is_admin(ctx, team_id).await?;
    let channel = load_in_team::<Channel>(ctx, channel_id, team_id, "Channel").await?;

    let patch = UpdateChannelArgs {
        name: args.name.as_deref().map(|n| required_text("name", n, NAME_MAX)).transpose()?,
        icon: optional_text("icon", args.icon.as_deref(), NAME_MAX)?,
        ..args
    };
    let mut batch = WriteBatch::new();
    batch.patch::<Channel, _>(channel_id, &patch)?;

    // Whoever makes a channel private keeps access to it
    let becomes_private = !channel.private && patch.private == Some(true);
    if becomes_private && find_channel_member(ctx, channel_id, admin.user_id()).await?.is_none() {
        batch.require_absent::<ChannelMember>(
            FilterData::new().eq_id("channelId", channel_id).eq_id("userId", admin.user_id()),
            "User is already a channel member",
        );
        batch.insert(&ChannelMember {
            user_id: admin.user_id(),
            channel_id,
            team_id,
        })?;
    }
    batch.commit(ctx.store()).await?;
    Ok(())
}

/// Delete a channel with its memberships, messages and their reactions.
pub async fn delete_channel(ctx: &RequestContext, team_id: Uuid, channel_id: Uuid) -> Result<(), ApiError> {
    let admin = is_admin(ctx, team_id).await?;
    load_in_team::<Channel>(ctx, channel_id, team_id, "Channel").await?;

    let in_channel = FilterData::new().eq_id("channelId", channel_id);
    let mut batch = WriteBatch::new();

    for row in ctx.repo::<ChannelMember>().select_any(in_channel.clone()).await? {
        batch.delete::<ChannelMember>(row.id);
    }

    let messages = ctx.repo::<Message>().select_any(in_channel).await?;
    let message_ids: HashSet<Uuid> = messages.iter().map(|m| m.id).collect();
    if !message_ids.is_empty() {
        let reactions = ctx
            .repo::<Reaction>()
            .select_any(FilterData::new().eq_id("teamId", team_id))
            .await?;
        for reaction in reactions.iter().filter(|r| message_ids.contains(&r.message_id)) {
            batch.delete::<Reaction>(reaction.id);
        }
    }
    for message in &messages {
        batch.delete::<Message>(message.id);
    }
    batch.delete::<Channel>(channel_id);
    batch.commit(ctx.store()).await?;

    tracing::info!(
        "User {} deleted channel {} ({} messages)",
        admin.user_id(),
        channel_id,
        messages.len()
    );
    Ok(())
}

pub async fn list_channel_members(
    ctx: &RequestContext,
    team_id: Uuid,
    channel_id: Uuid,
) -> Result<Vec<ChannelMemberView>, ApiError> {
    readable_channel(ctx, team_id, channel_id).await?;

    let rows = ctx
        .repo::<ChannelMember>()
        .select_any(FilterData::new().eq_id("channelId", channel_id))
        .await?;
    let user_ids: Vec<Uuid> = rows.iter().map(|row| row.user_id).collect();
    let mut users: HashMap<Uuid, Stored<User>> = ctx
        .repo::<User>()
        .select_ids(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let user = users.remove(&row.user_id)?;
            Some(ChannelMemberView { channel_member_id: row.id, user })
        })
        .collect())
}

/// Add team members to a channel, skipping users that already belong to it.
/// Returns the ids of the new channel membership rows.
pub async fn add_channel_members(
    ctx: &RequestContext,
    team_id: Uuid,
    channel_id: Uuid,
    args: AddChannelMembersArgs,
) -> Result<Vec<Uuid>, ApiError> {
    is_admin(ctx, team_id).await?;
    load_in_team::<Channel>(ctx, channel_id, team_id, "Channel").await?;

    let existing: HashSet<Uuid> = ctx
        .repo::<ChannelMember>()
        .select_any(FilterData::new().eq_id("channelId", channel_id))
        .await?
        .into_iter()
        .map(|row| row.user_id)
        .collect();

    let mut seen = HashSet::new();
    let new_users: Vec<Uuid> = args
        .user_ids
        .into_iter()
        .filter(|id| !existing.contains(id) && seen.insert(*id))
        .collect();
    if new_users.is_empty() {
        return Err(ApiError::bad_request("All selected users are already channel members"));
    }

    let mut batch = WriteBatch::new();
    let mut created = Vec::with_capacity(new_users.len());
    for user_id in new_users {
        if find_member(ctx, team_id, user_id).await?.is_none() {
            return Err(ApiError::bad_request(format!("User {} is not a member of this team", user_id)));
        }
        batch.require_absent::<ChannelMember>(
            FilterData::new().eq_id("channelId", channel_id).eq_id("userId", user_id),
            format!("User {} is already a channel member", user_id),
        );
        created.push(batch.insert(&ChannelMember { user_id, channel_id, team_id })?);
    }
    batch.commit(ctx.store()).await?;

    tracing::debug!("Added {} members to channel {}", created.len(), channel_id);
    Ok(created)
}

pub async fn remove_channel_member(
    ctx: &RequestContext,
    team_id: Uuid,
    channel_id: Uuid,
    channel_member_id: Uuid,
) -> Result<(), ApiError> {
    is_admin(ctx, team_id).await?;
    let row = load_in_team::<ChannelMember>(ctx, channel_member_id, team_id, "Channel member").await?;
    if row.channel_id != channel_id {
        return Err(ApiError::not_found("Channel member not found"));
    }
    ctx.repo::<ChannelMember>().delete(row.id).await?;
    Ok(())
}

/// Remove the caller's single membership row. Leaving a public channel the
/// caller never explicitly joined does nothing.
pub async fn leave_channel(ctx: &RequestContext, team_id: Uuid, channel_id: Uuid) -> Result<(), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let channel = load_in_team::<Channel>(ctx, channel_id, team_id, "Channel").await?;

    match find_channel_member(ctx, channel_id, membership.user_id()).await? {
        Some(row) => {
            ctx.repo::<ChannelMember>().delete(row.id).await?;
            Ok(())
        }
        None if channel.private => Err(ApiError::forbidden("You are not a member of this channel.")),
        None => Ok(()),
    }
}
