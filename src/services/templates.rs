use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Label, Priority, TaskStatus, Template};
use crate::database::{FilterData, Stored};
use crate::error::ApiError;
use crate::services::access::{is_admin, is_member, load_in_team};
use crate::services::validation::{required_text, NAME_MAX, TEXT_MAX};
use crate::services::RequestContext;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateArgs {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default)]
    pub label: Option<Uuid>,
}

pub async fn list_templates(ctx: &RequestContext, team_id: Uuid) -> Result<Vec<Stored<Template>>, ApiError> {
    is_member(ctx, team_id).await?;
    Ok(ctx
        .repo::<Template>()
        .select_any(FilterData::new().eq_id("teamId", team_id))
        .await?)
}

pub async fn create_template(ctx: &RequestContext, team_id: Uuid, args: CreateTemplateArgs) -> Result<Uuid, ApiError> {
    is_admin(ctx, team_id).await?;
    if let Some(label) = args.label {
        load_in_team::<Label>(ctx, label, team_id, "Label").await?;
    }
    if args.description.chars().count() > TEXT_MAX {
        return Err(ApiError::invalid_field("description", format!("must be at most {} characters", TEXT_MAX)));
    }

    let template = Template {
        title: required_text("title", &args.title, NAME_MAX)?,
        description: args.description,
        status: args.status,
        priority: args.priority,
        label: args.label,
        team_id,
    };
    Ok(ctx.repo::<Template>().insert(&template).await?)
}

pub async fn delete_template(ctx: &RequestContext, team_id: Uuid, template_id: Uuid) -> Result<(), ApiError> {
    is_admin(ctx, team_id).await?;
    load_in_team::<Template>(ctx, template_id, team_id, "Template").await?;
    ctx.repo::<Template>().delete(template_id).await?;
    Ok(())
}
