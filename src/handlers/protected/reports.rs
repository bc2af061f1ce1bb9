use axum::{extract::Path, Json};
use uuid::Uuid;

use crate::database::models::Report;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::reports::{self, CreateReportArgs};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams/:team/reports
pub async fn list(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Vec<Stored<Report>>> {
    Ok(ApiResponse::success(reports::list_reports(&ctx, team_id).await?))
}

/// POST /api/teams/:team/reports
pub async fn create(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<CreateReportArgs>,
) -> ApiResult<Created> {
    let id = reports::create_report(&ctx, team_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}
