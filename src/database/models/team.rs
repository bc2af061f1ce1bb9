use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    pub image_url: Option<String>,
    pub status: TeamStatus,
    pub join_code: Option<u32>,
    pub created_by: Uuid,
}

impl Record for Team {
    const TABLE: Table = Table::Teams;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    /// Roles allowed to change team-level configuration.
    pub const ADMIN_ROLES: [Role; 2] = [Role::Owner, Role::Admin];

    pub fn is_admin(&self) -> bool {
        Self::ADMIN_ROLES.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub role: Role,
}

impl Record for Member {
    const TABLE: Table = Table::Members;
}
