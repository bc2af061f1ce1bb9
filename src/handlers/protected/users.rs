use crate::database::models::User;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{users, RequestContext};
use crate::types::Created;

/// GET /api/users/me - The caller's user record
pub async fn me_get(ctx: RequestContext) -> ApiResult<Stored<User>> {
    Ok(ApiResponse::success(users::current_user(&ctx).await?))
}

/// POST /api/users/me - Create or refresh the caller's user record from the token
pub async fn me_post(ctx: RequestContext) -> ApiResult<Created> {
    let id = users::store_user(&ctx).await?;
    Ok(ApiResponse::success(Created { id }))
}
