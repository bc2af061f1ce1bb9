use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Channel, Member, Project, ProjectMember, Role, Team, TeamStatus};
use crate::database::{DatabaseError, FilterData, Stored, Table, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{find_member, is_admin, is_auth, is_member, is_owner};
use crate::services::members::remove_user_from_team;
use crate::services::validation::{optional_text, required_text, NAME_MAX, TEXT_MAX};
use crate::services::RequestContext;

const DEFAULT_CHANNEL_NAME: &str = "general";
const JOIN_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamArgs {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TeamStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTeamArgs {
    pub join_code: u32,
}

/// A team together with the caller's role in it.
#[derive(Debug, Clone, Serialize)]
pub struct TeamSummary {
    #[serde(flatten)]
    pub team: Stored<Team>,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinCodePatch {
    join_code: Option<u32>,
}

/// Create a team, its owner membership and a default channel in one batch.
pub async fn create_team(ctx: &RequestContext, args: CreateTeamArgs) -> Result<Uuid, ApiError> {
    let user = is_auth(ctx).await?;
    let name = required_text("name", &args.name, NAME_MAX)?;

    let mut batch = WriteBatch::new();
    let team_id = batch.insert(&Team {
        name,
        image_url: None,
        status: TeamStatus::Inactive,
        join_code: None,
        created_by: user.id,
    })?;
    batch.insert(&Member {
        user_id: user.id,
        team_id,
        role: Role::Owner,
    })?;
    batch.insert(&Channel {
        name: DEFAULT_CHANNEL_NAME.to_string(),
        icon: "#".to_string(),
        allows_writing: true,
        private: false,
        team_id,
    })?;
    batch.commit(ctx.store()).await?;

    tracing::info!("User {} created team {}", user.id, team_id);
    Ok(team_id)
}

pub async fn list_teams(ctx: &RequestContext) -> Result<Vec<TeamSummary>, ApiError> {
    let user = is_auth(ctx).await?;
    let memberships = ctx
        .repo::<Member>()
        .select_any(FilterData::new().eq_id("userId", user.id))
        .await?;

    let team_ids: Vec<Uuid> = memberships.iter().map(|m| m.team_id).collect();
    let teams = ctx.repo::<Team>().select_ids(&team_ids).await?;

    Ok(teams
        .into_iter()
        .filter_map(|team| {
            let role = memberships.iter().find(|m| m.team_id == team.id)?.role;
            Some(TeamSummary { team, role })
        })
        .collect())
}

pub async fn get_team(ctx: &RequestContext, team_id: Uuid) -> Result<TeamSummary, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let team = ctx
        .repo::<Team>()
        .get(team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    Ok(TeamSummary { team, role: membership.role() })
}

pub async fn update_team(ctx: &RequestContext, team_id: Uuid, args: UpdateTeamArgs) -> Result<(), ApiError> {
    is_admin(ctx, team_id).await?;

    let patch = UpdateTeamArgs {
        name: args.name.as_deref().map(|n| required_text("name", n, NAME_MAX)).transpose()?,
        status: args.status,
        image_url: optional_text("imageUrl", args.image_url.as_deref(), TEXT_MAX)?,
    };
    ctx.repo::<Team>().patch(team_id, &patch).await?;
    Ok(())
}

/// Owner-only. Removes the team and every record scoped to it.
pub async fn delete_team(ctx: &RequestContext, team_id: Uuid) -> Result<(), ApiError> {
    let owner = is_owner(ctx, team_id).await?;

    let mut batch = WriteBatch::new();
    let scoped = FilterData::new().eq_id("teamId", team_id);
    for table in Table::ALL.into_iter().filter(Table::is_team_scoped) {
        for record in ctx.store().query(table, &scoped).await? {
            batch.delete_raw(table, record.id);
        }
    }
    batch.delete::<Team>(team_id);

    let removed = batch.len();
    batch.commit(ctx.store()).await?;
    tracing::info!("User {} deleted team {} ({} records)", owner.user_id(), team_id, removed);
    Ok(())
}

/// Issue a fresh 6-digit invitation code, replacing any previous one.
pub async fn regenerate_join_code(ctx: &RequestContext, team_id: Uuid) -> Result<u32, ApiError> {
    is_admin(ctx, team_id).await?;

    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = random_join_code();
        let mut batch = WriteBatch::new();
        batch.require_absent::<Team>(FilterData::new().eq("joinCode", code), "Join code already in use");
        batch.patch::<Team, _>(team_id, &JoinCodePatch { join_code: Some(code) })?;
        match batch.commit(ctx.store()).await {
            Ok(()) => return Ok(code),
            Err(DatabaseError::Conflict(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(ApiError::conflict("Could not allocate a unique join code, please retry"))
}

pub async fn disable_join_code(ctx: &RequestContext, team_id: Uuid) -> Result<(), ApiError> {
    is_admin(ctx, team_id).await?;
    ctx.repo::<Team>().patch(team_id, &JoinCodePatch { join_code: None }).await?;
    Ok(())
}

/// Join a team by invitation code as a plain member. Projects marked
/// `autojoin` gain the new member as well.
pub async fn join_team(ctx: &RequestContext, args: JoinTeamArgs) -> Result<Uuid, ApiError> {
    let user = is_auth(ctx).await?;
    let team = ctx
        .repo::<Team>()
        .select_one(FilterData::new().eq("joinCode", args.join_code))
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid join code"))?;

    if find_member(ctx, team.id, user.id).await?.is_some() {
        return Err(ApiError::conflict("You are already a member of this team"));
    }

    let mut batch = WriteBatch::new();
    batch.require_absent::<Member>(
        FilterData::new().eq_id("teamId", team.id).eq_id("userId", user.id),
        "You are already a member of this team",
    );
    batch.require_unchanged::<Team, _>(team.id, "joinCode", &args.join_code, "Invalid join code")?;
    batch.insert(&Member {
        user_id: user.id,
        team_id: team.id,
        role: Role::Member,
    })?;

    let autojoin = ctx
        .repo::<Project>()
        .select_any(FilterData::new().eq_id("teamId", team.id).eq("autojoin", true))
        .await?;
    for project in autojoin {
        batch.insert(&ProjectMember {
            user_id: user.id,
            project_id: project.id,
            team_id: team.id,
        })?;
    }
    batch.commit(ctx.store()).await?;

    tracing::info!("User {} joined team {}", user.id, team.id);
    Ok(team.id)
}

pub async fn leave_team(ctx: &RequestContext, team_id: Uuid) -> Result<(), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    if membership.role() == Role::Owner {
        return Err(ApiError::forbidden("The team owner cannot leave the team"));
    }

    let mut batch = WriteBatch::new();
    remove_user_from_team(ctx, &mut batch, &membership.member).await?;
    batch.commit(ctx.store()).await?;
    Ok(())
}

fn random_join_code() -> u32 {
    (Uuid::new_v4().as_u128() % 900_000) as u32 + 100_000
}
