use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Asset, Storage};
use crate::database::{FilterData, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{is_member, load_in_team};
use crate::services::validation::{optional_text, required_text, NAME_MAX};
use crate::services::RequestContext;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStorageArgs {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Query parameters accompanying a raw upload body.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

/// An asset with its resolved public URL.
#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Stored<Asset>,
    pub url: String,
}

fn asset_view(ctx: &RequestContext, asset: Stored<Asset>) -> Result<AssetView, ApiError> {
    let url = ctx.files().resolve_url(&asset.storage_key)?.to_string();
    Ok(AssetView { asset, url })
}

pub async fn list_storages(ctx: &RequestContext, team_id: Uuid) -> Result<Vec<Stored<Storage>>, ApiError> {
    is_member(ctx, team_id).await?;
    Ok(ctx
        .repo::<Storage>()
        .select_any(FilterData::new().eq_id("teamId", team_id))
        .await?)
}

pub async fn get_storage(ctx: &RequestContext, team_id: Uuid, storage_id: Uuid) -> Result<Stored<Storage>, ApiError> {
    is_member(ctx, team_id).await?;
    load_in_team::<Storage>(ctx, storage_id, team_id, "Storage").await
}

pub async fn create_storage(ctx: &RequestContext, team_id: Uuid, args: CreateStorageArgs) -> Result<Uuid, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let storage = Storage {
        name: required_text("name", &args.name, NAME_MAX)?,
        icon: optional_text("icon", args.icon.as_deref(), NAME_MAX)?,
        team_id,
        created_by: membership.user_id(),
    };
    Ok(ctx.repo::<Storage>().insert(&storage).await?)
}

/// Creators and admins delete a storage along with its assets.
pub async fn delete_storage(ctx: &RequestContext, team_id: Uuid, storage_id: Uuid) -> Result<(), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let storage = load_in_team::<Storage>(ctx, storage_id, team_id, "Storage").await?;
    if storage.created_by != membership.user_id() && !membership.is_admin() {
        return Err(ApiError::no_permission());
    }

    let assets = ctx
        .repo::<Asset>()
        .select_any(FilterData::new().eq_id("storageId", storage.id))
        .await?;
    let mut batch = WriteBatch::new();
    for asset in &assets {
        batch.delete::<Asset>(asset.id);
    }
    batch.delete::<Storage>(storage.id);
    batch.commit(ctx.store()).await?;

    for asset in &assets {
        release_file(ctx, &asset.storage_key).await;
    }
    Ok(())
}

pub async fn list_assets(ctx: &RequestContext, team_id: Uuid, storage_id: Uuid) -> Result<Vec<AssetView>, ApiError> {
    is_member(ctx, team_id).await?;
    load_in_team::<Storage>(ctx, storage_id, team_id, "Storage").await?;

    ctx.repo::<Asset>()
        .select_any(FilterData::new().eq_id("storageId", storage_id).desc())
        .await?
        .into_iter()
        .map(|asset| asset_view(ctx, asset))
        .collect()
}

/// Store the bytes on disk and record them as an asset of the storage.
pub async fn upload_asset(
    ctx: &RequestContext,
    team_id: Uuid,
    storage_id: Uuid,
    query: UploadQuery,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<AssetView, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    load_in_team::<Storage>(ctx, storage_id, team_id, "Storage").await?;
    let name = required_text("name", &query.name, NAME_MAX)?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }

    let storage_key = ctx.files().put(bytes).await?;
    let asset = Asset {
        name,
        storage_key,
        content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        size: bytes.len() as u64,
        storage_id,
        team_id,
        uploaded_by: membership.user_id(),
    };
    let repo = ctx.repo::<Asset>();
    let id = repo.insert(&asset).await?;

    tracing::info!("User {} uploaded asset {} ({} bytes)", membership.user_id(), id, bytes.len());
    asset_view(ctx, repo.select_404(id).await?)
}

/// Uploaders and admins delete assets. The file is removed once no other
/// asset refers to the same content.
pub async fn delete_asset(ctx: &RequestContext, team_id: Uuid, asset_id: Uuid) -> Result<(), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let asset = load_in_team::<Asset>(ctx, asset_id, team_id, "Asset").await?;
    if asset.uploaded_by != membership.user_id() && !membership.is_admin() {
        return Err(ApiError::no_permission());
    }

    ctx.repo::<Asset>().delete(asset.id).await?;
    release_file(ctx, &asset.storage_key).await;
    Ok(())
}

/// Remove the file behind `storage_key` once no asset refers to it. Runs
/// after the records are gone, so failures leave an orphaned file and are
/// only logged.
async fn release_file(ctx: &RequestContext, storage_key: &str) {
    let still_used = match ctx
        .repo::<Asset>()
        .select_one(FilterData::new().eq("storageKey", storage_key))
        .await
    {
        Ok(found) => found.is_some(),
        Err(err) => {
            tracing::warn!("Could not check references to file {}: {}", storage_key, err);
            return;
        }
    };
    if still_used {
        return;
    }
    if let Err(err) = ctx.files().remove(storage_key).await {
        tracing::warn!("Could not remove file {}: {}", storage_key, err);
    }
}
