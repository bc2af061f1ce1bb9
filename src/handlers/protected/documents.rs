use axum::{
    extract::{Path, Query},
    Json,
};
use uuid::Uuid;

use crate::database::models::Document;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::documents::{self, CreateDocumentArgs, ListDocumentsQuery, UpdateDocumentArgs};
use crate::services::RequestContext;
use crate::types::Created;

/// GET /api/teams/:team/documents?parentDocument=
pub async fn list(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Query(query): Query<ListDocumentsQuery>,
) -> ApiResult<Vec<Stored<Document>>> {
    Ok(ApiResponse::success(documents::list_documents(&ctx, team_id, &query).await?))
}

/// GET /api/teams/:team/documents/trash
pub async fn trash(ctx: RequestContext, Path(team_id): Path<Uuid>) -> ApiResult<Vec<Stored<Document>>> {
    Ok(ApiResponse::success(documents::list_trash(&ctx, team_id).await?))
}

/// GET /api/teams/:team/documents/:document
pub async fn get(
    ctx: RequestContext,
    Path((team_id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Stored<Document>> {
    Ok(ApiResponse::success(documents::get_document(&ctx, team_id, document_id).await?))
}

/// POST /api/teams/:team/documents
pub async fn create(
    ctx: RequestContext,
    Path(team_id): Path<Uuid>,
    Json(args): Json<CreateDocumentArgs>,
) -> ApiResult<Created> {
    let id = documents::create_document(&ctx, team_id, args).await?;
    Ok(ApiResponse::created(Created { id }))
}

/// PATCH /api/teams/:team/documents/:document
pub async fn update(
    ctx: RequestContext,
    Path((team_id, document_id)): Path<(Uuid, Uuid)>,
    Json(args): Json<UpdateDocumentArgs>,
) -> ApiResult<()> {
    documents::update_document(&ctx, team_id, document_id, args).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/teams/:team/documents/:document/archive
pub async fn archive(ctx: RequestContext, Path((team_id, document_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    documents::archive_document(&ctx, team_id, document_id).await?;
    Ok(ApiResponse::empty())
}

/// POST /api/teams/:team/documents/:document/restore
pub async fn restore(ctx: RequestContext, Path((team_id, document_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    documents::restore_document(&ctx, team_id, document_id).await?;
    Ok(ApiResponse::empty())
}

/// DELETE /api/teams/:team/documents/:document
pub async fn remove(ctx: RequestContext, Path((team_id, document_id)): Path<(Uuid, Uuid)>) -> ApiResult<()> {
    documents::delete_document(&ctx, team_id, document_id).await?;
    Ok(ApiResponse::empty())
}
