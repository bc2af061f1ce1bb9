use axum::{extract::Path, Json};
use uuid::Uuid;

use crate::database::models::Label;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::labels::{self, CreateLabelArgs, DeleteLabelsArgs};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams/:team/projects/:project/labels
pub async fn list(
    ctx: RequestContext,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Stored<Label>>> {
    Ok(ApiResponse::success(labels::list_labels(&ctx, team_id, project_id).await?))
}

/// POST /api/teams/:team/projects/:project/labels
pub async fn create(
    ctx: RequestContext,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<CreateLabelArgs>,
) -> ApiResult<Created> {
    let id = labels::create_label(&ctx, team_id, project_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// DELETE /api/teams/:team/labels - Bulk delete, body `{ "labelIds": [...] }`
pub async fn remove_many(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<DeleteLabelsArgs>,
) -> ApiResult<()> {
    labels::delete_labels(&ctx, team_id, args).await?;
    Ok(ApiResponse::empty())
}
