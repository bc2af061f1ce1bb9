use serde::Serialize;
use uuid::Uuid;

use crate::database::models::User;
use crate::database::{DatabaseError, FilterData, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{find_user_by_subject, is_auth};
use crate::services::validation::{required_text, NAME_MAX};
use crate::services::RequestContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserPatch<'a> {
    full_name: &'a str,
    email: &'a str,
    profile_image: &'a Option<String>,
}

/// Create or refresh the caller's user record from their token claims.
pub async fn store_user(ctx: &RequestContext) -> Result<Uuid, ApiError> {
    let identity = &ctx.identity;
    let email = identity.email.clone().unwrap_or_default();
    let full_name = match identity.name.as_deref() {
        Some(name) if !name.trim().is_empty() => required_text("name", name, NAME_MAX)?,
        _ if !email.is_empty() => email.split('@').next().unwrap_or_default().to_string(),
        _ => "Anonymous".to_string(),
    };

    let users = ctx.repo::<User>();
    if let Some(existing) = find_user_by_subject(ctx, &identity.subject).await? {
        let unchanged = existing.full_name == full_name
            && existing.email == email
            && existing.profile_image == identity.picture;
        if !unchanged {
            let patch = UserPatch {
                full_name: &full_name,
                email: &email,
                profile_image: &identity.picture,
            };
            users.patch(existing.id, &patch).await?;
            tracing::info!("Refreshed user {} from identity claims", existing.id);
        }
        return Ok(existing.id);
    }

    let mut batch = WriteBatch::new();
    batch.require_absent::<User>(
        FilterData::new().eq("clerkIdentifier", identity.subject.as_str()),
        "User already exists",
    );
    let id = batch.insert(&User {
        full_name,
        email,
        profile_image: identity.picture.clone(),
        clerk_identifier: identity.subject.clone(),
    })?;
    match batch.commit(ctx.store()).await {
        Ok(()) => {}
        Err(DatabaseError::Conflict(_)) => {
            // A concurrent sign-in created the record first.
            return find_user_by_subject(ctx, &identity.subject)
                .await?
                .map(|user| user.id)
                .ok_or_else(|| ApiError::conflict("User record changed, please retry"));
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!("Created user {} for identity {}", id, identity.subject);
    Ok(id)
}

pub async fn current_user(ctx: &RequestContext) -> Result<Stored<User>, ApiError> {
    is_auth(ctx).await
}
