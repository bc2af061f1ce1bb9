use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub name: String,
    pub icon: String,
    /// When false only admins may post.
    pub allows_writing: bool,
    pub private: bool,
    pub team_id: Uuid,
}

impl Record for Channel {
    const TABLE: Table = Table::Channels;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMember {
    pub user_id: Uuid,
    pub channel_id: Uuid,
    pub team_id: Uuid,
}

impl Record for ChannelMember {
    const TABLE: Table = Table::ChannelMembers;
}
