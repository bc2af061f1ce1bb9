use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::database::models::{Label, Priority, Task, TaskStatus};
use crate::database::{FilterData, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{find_member, is_member, load_in_team};
use crate::services::projects::accessible_project;
use crate::services::validation::{nullable, required_text, NAME_MAX, TEXT_MAX};
use crate::services::RequestContext;

/// Optional equality filters shared by the task listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub label: Option<Uuid>,
}

impl TaskFilters {
    fn apply(&self, mut filter: FilterData) -> FilterData {
        if let Some(status) = self.status {
            filter = filter.eq("status", serde_json::json!(status));
        }
        if let Some(priority) = self.priority {
            filter = filter.eq("priority", serde_json::json!(priority));
        }
        if let Some(label) = self.label {
            filter = filter.eq_id("label", label);
        }
        filter
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskArgs {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub label: Option<Uuid>,
    pub due_date: Option<i64>,
    pub parent_task: Option<Uuid>,
    pub assignee: Option<Uuid>,
    pub project_id: Uuid,
}

fn default_status() -> TaskStatus {
    TaskStatus::Todo
}

fn default_priority() -> Priority {
    Priority::Medium
}

/// Partial task update. `label`, `dueDate` and `assignee` may be set to
/// `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTasksArgs {
    pub task_ids: Vec<Uuid>,
}

async fn check_label(ctx: &RequestContext, team_id: Uuid, project_id: Uuid, label: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(label_id) = label {
        let label = load_in_team::<Label>(ctx, label_id, team_id, "Label").await?;
        if label.project_id != project_id {
            return Err(ApiError::invalid_field("label", "belongs to another project"));
        }
    }
    Ok(())
}

async fn check_assignee(ctx: &RequestContext, team_id: Uuid, assignee: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(user_id) = assignee {
        if find_member(ctx, team_id, user_id).await?.is_none() {
            return Err(ApiError::invalid_field("assignee", "is not a member of this team"));
        }
    }
    Ok(())
}

/// Top-level tasks of a project, newest first.
pub async fn list_project_tasks(
    ctx: &RequestContext,
    team_id: Uuid,
    project_id: Uuid,
    filters: &TaskFilters,
) -> Result<Vec<Stored<Task>>, ApiError> {
    accessible_project(ctx, team_id, project_id).await?;

    let filter = FilterData::new()
        .eq_id("teamId", team_id)
        .eq_id("projectId", project_id)
        .eq("isSubTask", false)
        .desc();
    Ok(ctx.repo::<Task>().select_any(filters.apply(filter)).await?)
}

/// Top-level tasks in the team assigned to the caller, newest first.
pub async fn list_my_tasks(ctx: &RequestContext, team_id: Uuid, filters: &TaskFilters) -> Result<Vec<Stored<Task>>, ApiError> {
    let membership = is_member(ctx, team_id).await?;

    let filter = FilterData::new()
        .eq_id("teamId", team_id)
        .eq_id("assignee", membership.user_id())
        .eq("isSubTask", false)
        .desc();
    Ok(ctx.repo::<Task>().select_any(filters.apply(filter)).await?)
}

pub async fn list_subtasks(ctx: &RequestContext, team_id: Uuid, task_id: Uuid) -> Result<Vec<Stored<Task>>, ApiError> {
    let parent = load_in_team::<Task>(ctx, task_id, team_id, "Task").await?;
    accessible_project(ctx, team_id, parent.project_id).await?;

    let filter = FilterData::new()
        .eq_id("teamId", team_id)
        .eq_id("parentTask", parent.id)
        .eq("isSubTask", true)
        .desc();
    Ok(ctx.repo::<Task>().select_any(filter).await?)
}

pub async fn create_task(ctx: &RequestContext, team_id: Uuid, args: CreateTaskArgs) -> Result<Uuid, ApiError> {
    let (membership, project) = accessible_project(ctx, team_id, args.project_id).await?;
    let title = required_text("title", &args.title, NAME_MAX)?;
    if args.description.chars().count() > TEXT_MAX {
        return Err(ApiError::invalid_field("description", format!("must be at most {} characters", TEXT_MAX)));
    }

    if let Some(parent_id) = args.parent_task {
        let parent = load_in_team::<Task>(ctx, parent_id, team_id, "Parent task").await?;
        if parent.project_id != project.id || parent.is_sub_task {
            return Err(ApiError::invalid_field("parentTask", "must be a top-level task of the same project"));
        }
    }
    check_label(ctx, team_id, project.id, args.label).await?;
    check_assignee(ctx, team_id, args.assignee).await?;

    let id = ctx
        .repo::<Task>()
        .insert(&Task {
            title,
            description: args.description,
            status: args.status,
            priority: args.priority,
            label: args.label,
            due_date: args.due_date,
            parent_task: args.parent_task,
            is_sub_task: args.parent_task.is_some(),
            assignee: args.assignee,
            project_id: project.id,
            team_id,
        })
        .await?;

    tracing::debug!("User {} created task {} in project {}", membership.user_id(), id, project.id);
    Ok(id)
}

pub async fn update_task(ctx: &RequestContext, team_id: Uuid, task_id: Uuid, args: UpdateTaskArgs) -> Result<(), ApiError> {
    let task = load_in_team::<Task>(ctx, task_id, team_id, "Task").await?;
    accessible_project(ctx, team_id, task.project_id).await?;

    if let Some(label) = args.label {
        check_label(ctx, team_id, task.project_id, label).await?;
    }
    if let Some(assignee) = args.assignee {
        check_assignee(ctx, team_id, assignee).await?;
    }

    let patch = UpdateTaskArgs {
        title: args.title.as_deref().map(|t| required_text("title", t, NAME_MAX)).transpose()?,
        ..args
    };
    ctx.repo::<Task>().patch(task_id, &patch).await?;
    Ok(())
}

/// Delete a task together with its subtasks.
pub async fn delete_task(ctx: &RequestContext, team_id: Uuid, task_id: Uuid) -> Result<(), ApiError> {
    delete_tasks(ctx, team_id, DeleteTasksArgs { task_ids: vec![task_id] }).await
}

/// Bulk delete. Every task must be reachable by the caller or nothing is
/// removed.
pub async fn delete_tasks(ctx: &RequestContext, team_id: Uuid, args: DeleteTasksArgs) -> Result<(), ApiError> {
    is_member(ctx, team_id).await?;

    let mut doomed = BTreeSet::new();
    for task_id in args.task_ids {
        let task = load_in_team::<Task>(ctx, task_id, team_id, "Task").await?;
        accessible_project(ctx, team_id, task.project_id).await?;
        doomed.insert(task.id);

        let subtasks = ctx
            .repo::<Task>()
            .select_any(FilterData::new().eq_id("parentTask", task.id))
            .await?;
        doomed.extend(subtasks.into_iter().map(|s| s.id));
    }

    let mut batch = WriteBatch::new();
    for id in &doomed {
        batch.delete::<Task>(*id);
    }
    batch.commit(ctx.store()).await?;

    tracing::debug!("Deleted {} tasks in team {}", doomed.len(), team_id);
    Ok(())
}
