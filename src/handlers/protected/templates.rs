use axum::{extract::Path, Json};
use uuid::Uuid;

use crate::database::models::Template;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::templates::{self, CreateTemplateArgs};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams/:team/templates
pub async fn list(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Vec<Stored<Template>>> {
    Ok(ApiResponse::success(templates::list_templates(&ctx, team_id).await?))
}

/// POST /api/teams/:team/templates
pub async fn create(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<CreateTemplateArgs>,
) -> ApiResult<Created> {
    let id = templates::create_template(&ctx, team_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// DELETE /api/teams/:team/templates/:template
pub async fn remove(ctx: RequestContext, Path((team_id, template_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    templates::delete_template(&ctx, team_id, template_id).await?;
    Ok(ApiResponse::empty())
}
