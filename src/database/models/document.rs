use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_archived: bool,
    pub icon: Option<String>,
    pub cover_image: Option<String>,
    pub is_published: bool,
    pub parent_document: Option<Uuid>,
    pub created_by: Uuid,
    pub team_id: Uuid,
}

impl Record for Document {
    const TABLE: Table = Table::Documents;
}
