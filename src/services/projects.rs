use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::database::models::{Label, Project, ProjectIcon, ProjectMember, Task, User};
use crate::database::{DatabaseError, FilterData, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{is_admin, is_member, load_in_team, Membership};
use crate::services::validation::{required_text, NAME_MAX, TEXT_MAX};
use crate::services::RequestContext;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectArgs {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_icon")]
    pub icons: ProjectIcon,
    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default)]
    pub autojoin: bool,
}

fn default_icon() -> ProjectIcon {
    ProjectIcon {
        kind: "folder".to_string(),
        color: "#64748b".to_string(),
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<ProjectIcon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Stored<Project>,
    pub is_member: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMemberView {
    pub project_member_id: Uuid,
    #[serde(flatten)]
    pub user: Stored<User>,
}

async fn find_project_member(
    ctx: &RequestContext,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Stored<ProjectMember>>, ApiError> {
    let filter = FilterData::new().eq_id("projectId", project_id).eq_id("userId", user_id);
    Ok(ctx.repo::<ProjectMember>().select_one(filter).await?)
}

/// Load a project the caller may work in: public projects, projects they
/// joined, or any project for team admins.
pub(crate) async fn accessible_project(
    ctx: &RequestContext,
    team_id: Uuid,
    project_id: Uuid,
) -> Result<(Membership, Stored<Project>), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let project = load_in_team::<Project>(ctx, project_id, team_id, "Project").await?;
    if project.public || membership.is_admin() {
        return Ok((membership, project));
    }
    if find_project_member(ctx, project.id, membership.user_id()).await?.is_none() {
        return Err(ApiError::forbidden("You do not have access to this project."));
    }
    Ok((membership, project))
}

/// Public projects plus the private projects the caller joined.
pub async fn list_projects(ctx: &RequestContext, team_id: Uuid) -> Result<Vec<ProjectView>, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let joined: HashSet<Uuid> = ctx
        .repo::<ProjectMember>()
        .select_any(FilterData::new().eq_id("teamId", team_id).eq_id("userId", membership.user_id()))
        .await?
        .into_iter()
        .map(|row| row.project_id)
        .collect();

    let projects = ctx
        .repo::<Project>()
        .select_any(FilterData::new().eq_id("teamId", team_id))
        .await?;

    Ok(projects
        .into_iter()
        .filter(|p| p.public || joined.contains(&p.id))
        .map(|project| ProjectView {
            is_member: joined.contains(&project.id),
            project,
        })
        .collect())
}

pub async fn get_project(ctx: &RequestContext, team_id: Uuid, project_id: Uuid) -> Result<ProjectView, ApiError> {
    let (membership, project) = accessible_project(ctx, team_id, project_id).await?;
    let is_member = find_project_member(ctx, project.id, membership.user_id()).await?.is_some();
    Ok(ProjectView { project, is_member })
}

/// Admin only. The creator becomes the first project member.
pub async fn create_project(ctx: &RequestContext, team_id: Uuid, args: CreateProjectArgs) -> Result<Uuid, ApiError> {
    let admin = is_admin(ctx, team_id).await?;
    let name = required_text("name", &args.name, NAME_MAX)?;
    if args.description.chars().count() > TEXT_MAX {
        return Err(ApiError::invalid_field("description", format!("must be at most {} characters", TEXT_MAX)));
    }

    let mut batch = WriteBatch::new();
    let project_id = batch.insert(&Project {
        name,
        description: args.description.trim().to_string(),
        icons: args.icons,
        public: args.public,
        autojoin: args.autojoin,
        created_by: admin.user_id(),
        team_id,
    })?;
    batch.insert(&ProjectMember {
        user_id: admin.user_id(),
        project_id,
        team_id,
    })?;
    batch.commit(ctx.store()).await?;

    tracing::info!("User {} created project {} in team {}", admin.user_id(), project_id, team_id);
    Ok(project_id)
}

pub async fn update_project(
    ctx: &RequestContext,
    team_id: Uuid,
    project_id: Uuid,
    args: UpdateProjectArgs,
) -> Result<(), ApiError> {
    is_admin(ctx, team_id).await?;
    load_in_team::<Project>(ctx, project_id, team_id, "Project").await?;

    let patch = UpdateProjectArgs {
        name: args.name.as_deref().map(|n| required_text("name", n, NAME_MAX)).transpose()?,
        ..args
    };
    ctx.repo::<Project>().patch(project_id, &patch).await?;
    Ok(())
}

/// Delete a project with its tasks, labels and memberships.
pub async fn delete_project(ctx: &RequestContext, team_id: Uuid, project_id: Uuid) -> Result<(), ApiError> {
    let admin = is_admin(ctx, team_id).await?;
    load_in_team::<Project>(ctx, project_id, team_id, "Project").await?;

    let in_project = FilterData::new().eq_id("projectId", project_id);
    let mut batch = WriteBatch::new();
    for task in ctx.repo::<Task>().select_any(in_project.clone()).await? {
        batch.delete::<Task>(task.id);
    }
    for label in ctx.repo::<Label>().select_any(in_project.clone()).await? {
        batch.delete::<Label>(label.id);
    }
    for row in ctx.repo::<ProjectMember>().select_any(in_project).await? {
        batch.delete::<ProjectMember>(row.id);
    }
    batch.delete::<Project>(project_id);
    batch.commit(ctx.store()).await?;

    tracing::info!("User {} deleted project {}", admin.user_id(), project_id);
    Ok(())
}

pub async fn join_project(ctx: &RequestContext, team_id: Uuid, project_id: Uuid) -> Result<Uuid, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let project = load_in_team::<Project>(ctx, project_id, team_id, "Project").await?;
    if !project.public {
        return Err(ApiError::forbidden("Private projects cannot be joined directly."));
    }
    if let Some(existing) = find_project_member(ctx, project.id, membership.user_id()).await? {
        return Ok(existing.id);
    }

    let mut batch = WriteBatch::new();
    batch.require_absent::<ProjectMember>(
        FilterData::new().eq_id("projectId", project.id).eq_id("userId", membership.user_id()),
        "Already a member of this project",
    );
    let id = batch.insert(&ProjectMember {
        user_id: membership.user_id(),
        project_id,
        team_id,
    })?;
    match batch.commit(ctx.store()).await {
        Ok(()) => Ok(id),
        // Lost a race with another join; hand back the row that won.
        Err(DatabaseError::Conflict(_)) => find_project_member(ctx, project.id, membership.user_id())
            .await?
            .map(|row| row.id)
            .ok_or_else(|| ApiError::conflict("Project membership changed, please retry")),
        Err(err) => Err(err.into()),
    }
}

pub async fn leave_project(ctx: &RequestContext, team_id: Uuid, project_id: Uuid) -> Result<(), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    load_in_team::<Project>(ctx, project_id, team_id, "Project").await?;

    let row = find_project_member(ctx, project_id, membership.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("You are not a member of this project."))?;
    ctx.repo::<ProjectMember>().delete(row.id).await?;
    Ok(())
}

pub async fn list_project_members(
    ctx: &RequestContext,
    team_id: Uuid,
    project_id: Uuid,
) -> Result<Vec<ProjectMemberView>, ApiError> {
    accessible_project(ctx, team_id, project_id).await?;

    let rows = ctx
        .repo::<ProjectMember>()
        .select_any(FilterData::new().eq_id("projectId", project_id))
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
            Some(ProjectMemberView { project_member_id: row.id, user })
        })
        .collect())
}
