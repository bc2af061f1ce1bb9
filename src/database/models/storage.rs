use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::store::Table;

/// A named folder of uploaded assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    pub name: String,
    pub icon: Option<String>,
    pub team_id: Uuid,
    pub created_by: Uuid,
}

impl Record for Storage {
    const TABLE: Table = Table::Storages;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub name: String,
    /// Content hash naming the file in the file store.
    pub storage_key: String,
    pub content_type: String,
    pub size: u64,
    pub storage_id: Uuid,
    pub team_id: Uuid,
    pub uploaded_by: Uuid,
}

impl Record for Asset {
    const TABLE: Table = Table::Assets;
}
