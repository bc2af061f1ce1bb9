use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Query},
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use uuid::Uuid;

use crate::database::models::Storage;
use crate::error::ApiError;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::storages::{self, AssetView, CreateStorageArgs, UploadQuery};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams/:team/storages
pub async fn list(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Vec<Stored<Storage>>> {
    Ok(ApiResponse::success(storages::list_storages(&ctx, team_id).await?))
}

/// GET /api/teams/:team/storages/:storage
pub async fn get(
    ctx: RequestContext,
    Path((team_id, storage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Stored<Storage>> {
    Ok(ApiResponse::success(storages::get_storage(&ctx, team_id, storage_id).await?))
}

/// POST /api/teams/:team/storages
pub async fn create(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<CreateStorageArgs>,
) -> ApiResult<Created> {
    let id = storages::create_storage(&ctx, team_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// DELETE /api/teams/:team/storages/:storage
pub async fn remove(ctx: RequestContext, Path((team_id, storage_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    storages::delete_storage(&ctx, team_id, storage_id).await?;
    Ok(ApiResponse::empty())
}

/// GET /api/teams/:team/storages/:storage/assets
pub async fn assets_get(
    ctx: RequestContext,
    Path((team_id, storage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<AssetView>> {
    Ok(ApiResponse::success(storages::list_assets(&ctx, team_id, storage_id).await?))
}

/// POST /api/teams/:team/storages/:storage/assets?name= - Raw body upload
pub async fn assets_post(
    ctx: RequestContext,
    Path((team_id, storage_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<AssetView> {
    let body = body.map_err(|e| match e.status() {
        axum::http::StatusCode::PAYLOAD_TOO_LARGE => ApiError::payload_too_large("Upload exceeds the request size limit"),
        _ => ApiError::bad_request(e.body_text()),
    })?;
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let view = storages::upload_asset(&ctx, team_id, storage_id, query, content_type, &body).await?;
    Ok(ApiResponse::created(view))
}

/// DELETE /api/teams/:team/assets/:asset
pub async fn asset_delete(ctx: RequestContext, Path((team_id, asset_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    storages::delete_asset(&ctx, team_id, asset_id).await?;
    Ok(ApiResponse::empty())
}
