use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::task::Priority;
use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[serde(rename = "ui/ux")]
    UiUx,
    Functional,
    Performance,
    Security,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ReportType,
    pub priority: Priority,
    pub team_id: Uuid,
    pub created_by: Uuid,
}

impl Record for Report {
    const TABLE: Table = Table::Reports;
}
