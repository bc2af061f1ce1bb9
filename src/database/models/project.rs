use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectIcon {
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub description: String,
    pub icons: ProjectIcon,
    pub public: bool,
    /// New team members join the project automatically.
    pub autojoin: bool,
    pub created_by: Uuid,
    pub team_id: Uuid,
}

impl Record for Project {
    const TABLE: Table = Table::Projects;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub team_id: Uuid,
}

impl Record for ProjectMember {
    const TABLE: Table = Table::ProjectMembers;
}
