// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Route prefix: none (/, /health, /public/*). Files under /files are served
// by `ServeDir` directly from the router.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Document;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::documents;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Teamspace API",
            "version": version,
            "description": "Team collaboration backend: channels, projects, tasks, documents and file storage",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "files": "/files/:key (public)",
                "documents": "/public/documents/:document (public, published only)",
                "users": "/api/users/me (protected)",
                "teams": "/api/teams[/:team] (protected)",
                "channels": "/api/teams/:team/channels[/:channel] (protected)",
                "messages": "/api/teams/:team/messages/:message (protected)",
                "projects": "/api/teams/:team/projects[/:project] (protected)",
                "tasks": "/api/teams/:team/tasks[/:task] (protected)",
                "documents_api": "/api/teams/:team/documents[/:document] (protected)",
                "storages": "/api/teams/:team/storages[/:storage] (protected)",
            }
        }
    }))
}

/// GET /health - Liveness plus a round trip to the document store
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend_name();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": backend
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed on {} store: {}", backend, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": backend
                    }
                })),
            )
        }
    }
}

/// GET /public/documents/:document - Published document, no auth
pub async fn document_get(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<Stored<Document>> {
    Ok(ApiResponse::success(documents::get_public_document(&state, document_id).await?))
}
