use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::database::models::{Label, Project, Task, Template};
use crate::database::{FilterData, Record, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{is_admin, load_in_team};
use crate::services::projects::accessible_project;
use crate::services::validation::{required_text, NAME_MAX};
use crate::services::RequestContext;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabelArgs {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLabelsArgs {
    pub label_ids: Vec<Uuid>,
}

pub async fn list_labels(ctx: &RequestContext, team_id: Uuid, project_id: Uuid) -> Result<Vec<Stored<Label>>, ApiError> {
    accessible_project(ctx, team_id, project_id).await?;
    let filter = FilterData::new().eq_id("teamId", team_id).eq_id("projectId", project_id);
    Ok(ctx.repo::<Label>().select_any(filter).await?)
}

pub async fn create_label(
    ctx: &RequestContext,
    team_id: Uuid,
    project_id: Uuid,
    args: CreateLabelArgs,
) -> Result<Uuid, ApiError> {
    is_admin(ctx, team_id).await?;
    load_in_team::<Project>(ctx, project_id, team_id, "Project").await?;

    let label = Label {
        name: required_text("name", &args.name, NAME_MAX)?,
        color: required_text("color", &args.color, 32)?,
        project_id,
        team_id,
    };
    Ok(ctx.repo::<Label>().insert(&label).await?)
}

/// Delete labels and clear them from any task or template using them.
pub async fn delete_labels(ctx: &RequestContext, team_id: Uuid, args: DeleteLabelsArgs) -> Result<(), ApiError> {
    is_admin(ctx, team_id).await?;

    let ids: BTreeSet<Uuid> = args.label_ids.into_iter().collect();
    let mut batch = WriteBatch::new();
    for id in &ids {
        load_in_team::<Label>(ctx, *id, team_id, "Label").await?;

        let using = FilterData::new().eq_id("teamId", team_id).eq_id("label", *id);
        for task in ctx.repo::<Task>().select_any(using.clone()).await? {
            batch.patch_fields(Task::TABLE, task.id, cleared_label());
        }
        for template in ctx.repo::<Template>().select_any(using).await? {
            batch.patch_fields(Template::TABLE, template.id, cleared_label());
        }
        batch.delete::<Label>(*id);
    }
    batch.commit(ctx.store()).await?;
    Ok(())
}

fn cleared_label() -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("label".to_string(), Value::Null);
    fields
}
