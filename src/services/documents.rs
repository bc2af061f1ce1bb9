use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Document;
use crate::database::{FilterData, Record, Repository, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::{is_member, load_in_team};
use crate::services::validation::{nullable, optional_text, NAME_MAX};
use crate::services::RequestContext;

const CONTENT_MAX: usize = 1_000_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsQuery {
    pub parent_document: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentArgs {
    pub title: Option<String>,
    pub parent_document: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

/// Every document nested below `root`, breadth first.
async fn descendants(ctx: &RequestContext, root: Uuid) -> Result<Vec<Stored<Document>>, ApiError> {
    let documents = ctx.repo::<Document>();
    let mut found = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(parent) = queue.pop_front() {
        let children = documents
            .select_any(FilterData::new().eq_id("parentDocument", parent))
            .await?;
        queue.extend(children.iter().map(|c| c.id));
        found.extend(children);
    }
    Ok(found)
}

fn archived_flag(value: bool) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("isArchived".to_string(), Value::Bool(value));
    fields
}

/// Live documents directly under `parent_document`, or at the root.
pub async fn list_documents(
    ctx: &RequestContext,
    team_id: Uuid,
    query: &ListDocumentsQuery,
) -> Result<Vec<Stored<Document>>, ApiError> {
    is_member(ctx, team_id).await?;
    let filter = FilterData::new()
        .eq_id("teamId", team_id)
        .eq_opt_id("parentDocument", query.parent_document)
        .eq("isArchived", false)
        .desc();
    Ok(ctx.repo::<Document>().select_any(filter).await?)
}

pub async fn list_trash(ctx: &RequestContext, team_id: Uuid) -> Result<Vec<Stored<Document>>, ApiError> {
    is_member(ctx, team_id).await?;
    let filter = FilterData::new()
        .eq_id("teamId", team_id)
        .eq("isArchived", true)
        .desc();
    Ok(ctx.repo::<Document>().select_any(filter).await?)
}

pub async fn get_document(ctx: &RequestContext, team_id: Uuid, document_id: Uuid) -> Result<Stored<Document>, ApiError> {
    is_member(ctx, team_id).await?;
    load_in_team::<Document>(ctx, document_id, team_id, "Document").await
}

/// Unauthenticated read of a published, non-archived document.
pub async fn get_public_document(state: &AppState, document_id: Uuid) -> Result<Stored<Document>, ApiError> {
    match Repository::<Document>::new(state.store.clone()).get(document_id).await? {
        Some(document) if document.is_published && !document.is_archived => Ok(document),
        _ => Err(ApiError::not_found("Document not found")),
    }
}

pub async fn create_document(ctx: &RequestContext, team_id: Uuid, args: CreateDocumentArgs) -> Result<Uuid, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    if let Some(parent) = args.parent_document {
        load_in_team::<Document>(ctx, parent, team_id, "Parent document").await?;
    }

    let document = Document {
        title: optional_text("title", args.title.as_deref(), NAME_MAX)?,
        content: None,
        is_archived: false,
        icon: None,
        cover_image: None,
        is_published: false,
        parent_document: args.parent_document,
        created_by: membership.user_id(),
        team_id,
    };
    Ok(ctx.repo::<Document>().insert(&document).await?)
}

pub async fn update_document(
    ctx: &RequestContext,
    team_id: Uuid,
    document_id: Uuid,
    args: UpdateDocumentArgs,
) -> Result<(), ApiError> {
    is_member(ctx, team_id).await?;
    load_in_team::<Document>(ctx, document_id, team_id, "Document").await?;

    if let Some(title) = args.title.as_deref() {
        if title.chars().count() > NAME_MAX {
            return Err(ApiError::invalid_field("title", format!("must be at most {} characters", NAME_MAX)));
        }
    }
    if let Some(content) = args.content.as_deref() {
        if content.len() > CONTENT_MAX {
            return Err(ApiError::invalid_field("content", "is too large"));
        }
    }
    ctx.repo::<Document>().patch(document_id, &args).await?;
    Ok(())
}

/// Move a document and everything below it to the trash.
pub async fn archive_document(ctx: &RequestContext, team_id: Uuid, document_id: Uuid) -> Result<(), ApiError> {
    is_member(ctx, team_id).await?;
    let document = load_in_team::<Document>(ctx, document_id, team_id, "Document").await?;

    let mut batch = WriteBatch::new();
    batch.patch_fields(Document::TABLE, document.id, archived_flag(true));
    for child in descendants(ctx, document.id).await? {
        batch.patch_fields(Document::TABLE, child.id, archived_flag(true));
    }
    batch.commit(ctx.store()).await?;
    Ok(())
}

/// Restore a document and its subtree. A document whose parent is still in
/// the trash is moved to the root.
pub async fn restore_document(ctx: &RequestContext, team_id: Uuid, document_id: Uuid) -> Result<(), ApiError> {
    is_member(ctx, team_id).await?;
    let document = load_in_team::<Document>(ctx, document_id, team_id, "Document").await?;

    let mut fields = archived_flag(false);
    if let Some(parent_id) = document.parent_document {
        let parent_archived = ctx
            .repo::<Document>()
            .get(parent_id)
            .await?
            .map_or(true, |parent| parent.is_archived);
        if parent_archived {
            fields.insert("parentDocument".to_string(), Value::Null);
        }
    }

    let mut batch = WriteBatch::new();
    batch.patch_fields(Document::TABLE, document.id, fields);
    for child in descendants(ctx, document.id).await? {
        batch.patch_fields(Document::TABLE, child.id, archived_flag(false));
    }
    batch.commit(ctx.store()).await?;
    Ok(())
}

/// Creators and admins delete a document with its whole subtree.
pub async fn delete_document(ctx: &RequestContext, team_id: Uuid, document_id: Uuid) -> Result<(), ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let document = load_in_team::<Document>(ctx, document_id, team_id, "Document").await?;
    if document.created_by != membership.user_id() && !membership.is_admin() {
        return Err(ApiError::no_permission());
    }

    let mut batch = WriteBatch::new();
    for child in descendants(ctx, document.id).await? {
        batch.delete::<Document>(child.id);
    }
    batch.delete::<Document>(document.id);
    batch.commit(ctx.store()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::database::Table;
    use crate::testing::TestContext;

    fn titled(title: &str, parent: Option<Uuid>) -> CreateDocumentArgs {
        CreateDocumentArgs { title: Some(title.to_string()), parent_document: parent }
    }

    #[tokio::test]
    async fn documents_nest_under_parents() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let ctx = t.ctx("owner");

        let root = create_document(&ctx, team, titled("Handbook", None)).await.unwrap();
        create_document(&ctx, team, titled("Onboarding", Some(root))).await.unwrap();

        let top = list_documents(&ctx, team, &ListDocumentsQuery::default()).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, root);

        let children = list_documents(&ctx, team, &ListDocumentsQuery { parent_document: Some(root) }).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].title.as_deref(), Some("Onboarding"));
    }

    #[tokio::test]
    async fn archive_and_restore_are_recursive() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let ctx = t.ctx("owner");

        let root = create_document(&ctx, team, titled("Handbook", None)).await.unwrap();
        let child = create_document(&ctx, team, titled("Onboarding", Some(root))).await.unwrap();
        let grandchild = create_document(&ctx, team, titled("Day one", Some(child))).await.unwrap();

        archive_document(&ctx, team, root).await.unwrap();
        assert_eq!(list_trash(&ctx, team).await.unwrap().len(), 3);
        assert!(list_documents(&ctx, team, &ListDocumentsQuery::default()).await.unwrap().is_empty());

        // Restoring a child of a trashed parent moves it to the root
        restore_document(&ctx, team, child).await.unwrap();
        let restored = get_document(&ctx, team, child).await.unwrap();
        assert!(!restored.is_archived);
        assert_eq!(restored.parent_document, None);
        assert!(!get_document(&ctx, team, grandchild).await.unwrap().is_archived);
        assert_eq!(list_trash(&ctx, team).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_requires_creator_or_admin() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let a = t.member_of(team, "a", Role::Member).await;
        let b = t.member_of(team, "b", Role::Member).await;

        let doc = create_document(&a, team, titled("Notes", None)).await.unwrap();
        create_document(&a, team, titled("More notes", Some(doc))).await.unwrap();

        assert_eq!(delete_document(&b, team, doc).await.unwrap_err(), ApiError::no_permission());
        delete_document(&a, team, doc).await.unwrap();
        assert_eq!(t.store.len(Table::Documents).await, 0);
    }

    #[tokio::test]
    async fn only_published_documents_are_public() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let ctx = t.ctx("owner");
        let doc = create_document(&ctx, team, titled("Launch", None)).await.unwrap();

        assert!(get_public_document(&ctx.state, doc).await.is_err());

        let publish = UpdateDocumentArgs { is_published: Some(true), content: Some("hello".into()), ..Default::default() };
        update_document(&ctx, team, doc, publish).await.unwrap();
        let public = get_public_document(&ctx.state, doc).await.unwrap();
        assert_eq!(public.content.as_deref(), Some("hello"));

        archive_document(&ctx, team, doc).await.unwrap();
        assert!(get_public_document(&ctx.state, doc).await.is_err());
    }

    #[tokio::test]
    async fn non_members_cannot_read_documents() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let doc = create_document(&t.ctx("owner"), team, titled("Secret", None)).await.unwrap();
        let outsider = t.user("outsider").await;
        assert!(matches!(get_document(&outsider, team, doc).await.unwrap_err(), ApiError::Forbidden(_)));
    }
}
