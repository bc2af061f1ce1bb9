use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{ChannelMember, Member, ProjectMember, Role, User};
use crate::database::{FilterData, Record, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{find_member, is_admin, is_member, load_in_team};
use crate::services::RequestContext;

/// A team member with the user's profile flattened in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub member_id: Uuid,
    pub role: Role,
    pub team_id: Uuid,
    #[serde(flatten)]
    pub user: Stored<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleArgs {
    pub role: Role,
}

pub async fn list_members(ctx: &RequestContext, team_id: Uuid) -> Result<Vec<MemberView>, ApiError> {
    is_member(ctx, team_id).await?;

    let members = ctx
        .repo::<Member>()
        .select_any(FilterData::new().eq_id("teamId", team_id))
        .await?;
    let user_ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
    let mut users: HashMap<Uuid, Stored<User>> = ctx
        .repo::<User>()
        .select_ids(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(members
        .into_iter()
        .filter_map(|member| {
            let user = users.remove(&member.user_id)?;
            Some(MemberView {
                member_id: member.id,
                role: member.role,
                team_id: member.team_id,
                user,
            })
        })
        .collect())
}

/// Remove a user from the team along with their channel and project
/// memberships there.
pub async fn delete_member(ctx: &RequestContext, team_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    let admin = is_admin(ctx, team_id).await?;

    let member = find_member(ctx, team_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User is not a member of this team."))?;
    if member.role == Role::Owner {
        return Err(ApiError::forbidden("The team owner cannot be removed."));
    }

    let mut batch = WriteBatch::new();
    remove_user_from_team(ctx, &mut batch, &member).await?;
    batch.commit(ctx.store()).await?;

    tracing::info!("User {} removed user {} from team {}", admin.user_id(), user_id, team_id);
    Ok(())
}

pub async fn update_member_role(
    ctx: &RequestContext,
    team_id: Uuid,
    member_id: Uuid,
    args: UpdateRoleArgs,
) -> Result<(), ApiError> {
    let caller = is_admin(ctx, team_id).await?;
    let target = load_in_team::<Member>(ctx, member_id, team_id, "Member").await?;

    if target.role == args.role {
        return Ok(());
    }
    let touches_owner = target.role == Role::Owner || args.role == Role::Owner;
    if touches_owner && caller.role() != Role::Owner {
        return Err(ApiError::no_permission());
    }

    if target.role == Role::Owner {
        let owners = ctx
            .repo::<Member>()
            .select_any(FilterData::new().eq_id("teamId", team_id).eq("role", Role::Owner.as_str()))
            .await?;
        if owners.len() < 2 {
            return Err(ApiError::conflict("A team must keep at least one owner"));
        }
    }

    ctx.repo::<Member>().patch(member_id, &args).await?;
    tracing::info!(
        "User {} changed role of member {} to {}",
        caller.user_id(),
        member_id,
        args.role.as_str()
    );
    Ok(())
}

/// Stage deletion of a membership row and every channel/project membership
/// the same user holds in that team.
pub(crate) async fn remove_user_from_team(
    ctx: &RequestContext,
    batch: &mut WriteBatch,
    member: &Stored<Member>,
) -> Result<(), ApiError> {
    let scoped = FilterData::new()
        .eq_id("teamId", member.team_id)
        .eq_id("userId", member.user_id);

    for row in ctx.repo::<ChannelMember>().select_any(scoped.clone()).await? {
        batch.delete::<ChannelMember>(row.id);
    }
    for row in ctx.repo::<ProjectMember>().select_any(scoped).await? {
        batch.delete::<ProjectMember>(row.id);
    }
    batch.delete_raw(Member::TABLE, member.id);
    Ok(())
}
