use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::Store;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::storage::FileStorage;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub files: Arc<FileStorage>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, files: FileStorage, config: AppConfig) -> Self {
        Self {
            store,
            files: Arc::new(files),
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(user_routes())
        .merge(team_routes())
        .merge(channel_routes())
        .merge(message_routes())
        .merge(project_routes())
        .merge(task_routes())
        .merge(document_routes())
        .merge(storage_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/public/documents/:document", get(public::document_get))
        .nest_service("/files", ServeDir::new(state.files.root()))
        // Protected
        .merge(api)
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new().route("/api/users/me", get(users::me_get).post(users::me_post))
}

fn team_routes() -> Router<AppState> {
    use protected::{members, teams};

    Router::new()
        .route("/api/teams", get(teams::list).post(teams::create))
        .route("/api/teams/join", post(teams::join))
        .route(
            "/api/teams/:team",
            get(teams::get).patch(teams::update).delete(teams::remove),
        )
        .route(
            "/api/teams/:team/join-code",
            post(teams::join_code_post).delete(teams::join_code_delete),
        )
        .route("/api/teams/:team/leave", post(teams::leave))
        .route("/api/teams/:team/members", get(members::list))
        // DELETE addresses the member by user id, PATCH by membership id
        .route(
            "/api/teams/:team/members/:member",
            delete(members::remove).patch(members::update_role),
        )
}

fn channel_routes() -> Router<AppState> {
    use protected::channels;

    Router::new()
        .route(
            "/api/teams/:team/channels",
            get(channels::list_all).post(channels::create),
        )
        .route("/api/teams/:team/channels/visible", get(channels::list_visible))
        .route(
            "/api/teams/:team/channels/:channel",
            get(channels::get).patch(channels::update).delete(channels::remove),
        )
        .route(
            "/api/teams/:team/channels/:channel/members",
            get(channels::members_get).post(channels::members_post),
        )
        .route(
            "/api/teams/:team/channels/:channel/members/:channel_member",
            delete(channels::member_delete),
        )
        .route("/api/teams/:team/channels/:channel/leave", post(channels::leave))
}

fn message_routes() -> Router<AppState> {
    use protected::messages;

    Router::new()
        .route(
            "/api/teams/:team/channels/:channel/messages",
            get(messages::list).post(messages::send),
        )
        .route(
            "/api/teams/:team/messages/:message",
            patch(messages::update).delete(messages::remove),
        )
        .route("/api/teams/:team/messages/:message/replies", get(messages::replies))
        .route("/api/teams/:team/messages/:message/votes", post(messages::vote))
        .route("/api/teams/:team/messages/:message/reactions", post(messages::react))
}

fn project_routes() -> Router<AppState> {
    use protected::{labels, projects};

    Router::new()
        .route(
            "/api/teams/:team/projects",
            get(projects::list).post(projects::create),
        )
        .route(
            "/api/teams/:team/projects/:project",
            get(projects::get).patch(projects::update).delete(projects::remove),
        )
        .route("/api/teams/:team/projects/:project/join", post(projects::join))
        .route("/api/teams/:team/projects/:project/leave", post(projects::leave))
        .route("/api/teams/:team/projects/:project/members", get(projects::members))
        .route("/api/teams/:team/projects/:project/tasks", get(projects::tasks))
        .route(
            "/api/teams/:team/projects/:project/labels",
            get(labels::list).post(labels::create),
        )
        .route("/api/teams/:team/labels", delete(labels::remove_many))
}

fn task_routes() -> Router<AppState> {
    use protected::{reports, tasks, templates};

    Router::new()
        .route(
            "/api/teams/:team/tasks",
            post(tasks::create).delete(tasks::remove_many),
        )
        .route("/api/teams/:team/tasks/mine", get(tasks::mine))
        .route(
            "/api/teams/:team/tasks/:task",
            patch(tasks::update).delete(tasks::remove),
        )
        .route("/api/teams/:team/tasks/:task/subtasks", get(tasks::subtasks))
        .route(
            "/api/teams/:team/templates",
            get(templates::list).post(templates::create),
        )
        .route("/api/teams/:team/templates/:template", delete(templates::remove))
        .route(
            "/api/teams/:team/reports",
            get(reports::list).post(reports::create),
        )
}

fn document_routes() -> Router<AppState> {
    use protected::documents;

    Router::new()
        .route(
            "/api/teams/:team/documents",
            get(documents::list).post(documents::create),
        )
        .route("/api/teams/:team/documents/trash", get(documents::trash))
        .route(
            "/api/teams/:team/documents/:document",
            get(documents::get).patch(documents::update).delete(documents::remove),
        )
        .route("/api/teams/:team/documents/:document/archive", post(documents::archive))
        .route("/api/teams/:team/documents/:document/restore", post(documents::restore))
}

fn storage_routes() -> Router<AppState> {
    use protected::storages;

    Router::new()
        .route(
            "/api/teams/:team/storages",
            get(storages::list).post(storages::create),
        )
        .route(
            "/api/teams/:team/storages/:storage",
            get(storages::get).delete(storages::remove),
        )
        .route(
            "/api/teams/:team/storages/:storage/assets",
            get(storages::assets_get).post(storages::assets_post),
        )
        .route("/api/teams/:team/assets/:asset", delete(storages::asset_delete))
}
