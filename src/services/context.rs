use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::config::AppConfig;
use crate::database::{Record, Repository, Store};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::storage::FileStorage;
use crate::types::{PageRequest, PaginationQuery};

/// Everything a service operation needs: the shared state and the caller.
#[derive(Clone)]
pub struct RequestContext {
    pub state: AppState,
    pub identity: AuthUser,
}

impl RequestContext {
    pub fn new(state: AppState, identity: AuthUser) -> Self {
        Self { state, identity }
    }

    pub fn repo<T: Record>(&self) -> Repository<T> {
        Repository::new(self.state.store.clone())
    }

    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.config
    }

    pub fn files(&self) -> &FileStorage {
        &self.state.files
    }

    /// Clamp client pagination arguments to the configured page sizes.
    pub fn page_request(&self, query: PaginationQuery) -> PageRequest {
        PageRequest::new(self.config().page_size(query.num_items), query.cursor)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        Ok(Self::new(state.clone(), identity))
    }
}
