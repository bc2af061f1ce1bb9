use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::filter::FilterData;
use crate::database::manager::DatabaseError;

/// Every table known to the store. Table names never come from user input,
/// so they are safe to interpolate into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Users,
    Teams,
    Members,
    Projects,
    ProjectMembers,
    Tasks,
    Labels,
    Templates,
    Channels,
    ChannelMembers,
    Messages,
    Reactions,
    Documents,
    Storages,
    Assets,
    Reports,
}

impl Table {
    pub const ALL: [Table; 16] = [
        Table::Users,
        Table::Teams,
        Table::Members,
        Table::Projects,
        Table::ProjectMembers,
        Table::Tasks,
        Table::Labels,
        Table::Templates,
        Table::Channels,
        Table::ChannelMembers,
        Table::Messages,
        Table::Reactions,
        Table::Documents,
        Table::Storages,
        Table::Assets,
        Table::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Teams => "teams",
            Table::Members => "members",
            Table::Projects => "projects",
            Table::ProjectMembers => "project_members",
            Table::Tasks => "tasks",
            Table::Labels => "labels",
            Table::Templates => "templates",
            Table::Channels => "channels",
            Table::ChannelMembers => "channel_members",
            Table::Messages => "messages",
            Table::Reactions => "reactions",
            Table::Documents => "documents",
            Table::Storages => "storages",
            Table::Assets => "assets",
            Table::Reports => "reports",
        }
    }

    /// Tables whose records carry a `teamId` reference.
    pub fn is_team_scoped(&self) -> bool {
        !matches!(self, Table::Users | Table::Teams)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as persisted: system fields plus the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: Uuid,
    /// Insertion position, strictly increasing per table.
    pub seq: i64,
    pub creation_time: DateTime<Utc>,
    pub body: Map<String, Value>,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert {
        table: Table,
        id: Uuid,
        body: Map<String, Value>,
    },
    /// Shallow merge of `fields` into the existing body. Fails if the record is missing.
    Patch {
        table: Table,
        id: Uuid,
        fields: Map<String, Value>,
    },
    /// Removing a missing record is a no-op.
    Delete { table: Table, id: Uuid },
    /// Fails the batch with `Conflict` when any record matches `filter`.
    RequireAbsent {
        table: Table,
        filter: FilterData,
        message: String,
    },
    /// Fails the batch with `Conflict` unless `field` of the record still
    /// equals `expected`. A missing field compares equal to `null`.
    RequireUnchanged {
        table: Table,
        id: Uuid,
        field: String,
        expected: Value,
        message: String,
    },
}

impl WriteOp {
    pub fn table(&self) -> Table {
        match self {
            WriteOp::Insert { table, .. }
            | WriteOp::Patch { table, .. }
            | WriteOp::Delete { table, .. }
            | WriteOp::RequireAbsent { table, .. }
            | WriteOp::RequireUnchanged { table, .. } => *table,
        }
    }
}

/// Document store backing every service. Implementations must apply a
/// `write` batch atomically: either every operation lands or none does.
/// Guard operations are checked against the state the batch commits on.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, table: Table, id: Uuid) -> Result<Option<RawRecord>, DatabaseError>;

    /// Records matching every equality in `filter`, ordered by insertion
    /// position and bounded by `filter.after`.
    async fn query(&self, table: Table, filter: &FilterData) -> Result<Vec<RawRecord>, DatabaseError>;

    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    fn backend_name(&self) -> &'static str;
}
