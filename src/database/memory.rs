use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::filter::{FilterData, SortOrder};
use crate::database::manager::DatabaseError;
use crate::database::store::{RawRecord, Store, Table, WriteOp};

type Rows = HashMap<Uuid, RawRecord>;

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Rows>,
    last_timestamp: Option<DateTime<Utc>>,
    last_seq: i64,
}

impl MemoryState {
    fn next_seq(&mut self) -> i64 {
        self.last_seq += 1;
        self.last_seq
    }

    /// Creation times strictly increase alongside `seq`.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

/// In-process store used for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a table.
    pub async fn len(&self, table: Table) -> usize {
        let state = self.state.read().await;
        state.tables.get(&table).map(|rows| rows.len()).unwrap_or(0)
    }

    /// Rewrite a record's creation time, for exercising time-based rules.
    #[cfg(test)]
    pub async fn set_creation_time(&self, table: Table, id: Uuid, at: DateTime<Utc>) {
        let mut state = self.state.write().await;
        if let Some(record) = state.tables.get_mut(&table).and_then(|rows| rows.get_mut(&id)) {
            record.creation_time = at;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, table: Table, id: Uuid) -> Result<Option<RawRecord>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.tables.get(&table).and_then(|rows| rows.get(&id)).cloned())
    }

    async fn query(&self, table: Table, filter: &FilterData) -> Result<Vec<RawRecord>, DatabaseError> {
        let state = self.state.read().await;
        let Some(rows) = state.tables.get(&table) else {
            return Ok(vec![]);
        };

        let mut matched: Vec<&RawRecord> = rows
            .values()
            .filter(|r| filter.matches(&r.body) && filter.follows(r.seq))
            .collect();
        matched.sort_by_key(|r| r.seq);
        if filter.order == SortOrder::Desc {
            matched.reverse();
        }

        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().take(limit).cloned().collect())
    }

    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;

        // Stage copies of the touched tables; nothing is visible until every op succeeded.
        let mut staged: BTreeMap<Table, Rows> = BTreeMap::new();
        for op in &ops {
            let table = op.table();
            if !staged.contains_key(&table) {
                let rows = state.tables.get(&table).cloned().unwrap_or_default();
                staged.insert(table, rows);
            }
        }

        for op in ops {
            match op {
                WriteOp::Insert { table, id, body } => {
                    let creation_time = state.next_timestamp();
                    let seq = state.next_seq();
                    let rows = staged.entry(table).or_default();
                    if rows.contains_key(&id) {
                        return Err(DatabaseError::QueryError(format!("duplicate id {} in {}", id, table)));
                    }
                    rows.insert(id, RawRecord { id, seq, creation_time, body });
                }
                WriteOp::Patch { table, id, fields } => {
                    let record = staged
                        .entry(table)
                        .or_default()
                        .get_mut(&id)
                        .ok_or_else(|| DatabaseError::NotFound(format!("{} record {}", table, id)))?;
                    record.body.extend(fields);
                }
                WriteOp::Delete { table, id } => {
                    staged.entry(table).or_default().remove(&id);
                }
                WriteOp::RequireAbsent { table, filter, message } => {
                    let rows = staged.entry(table).or_default();
                    if rows.values().any(|r| filter.matches(&r.body)) {
                        return Err(DatabaseError::Conflict(message));
                    }
                }
                WriteOp::RequireUnchanged { table, id, field, expected, message } => {
                    let record = staged
                        .entry(table)
                        .or_default()
                        .get(&id)
                        .ok_or_else(|| DatabaseError::NotFound(format!("{} record {}", table, id)))?;
                    if record.body.get(&field).unwrap_or(&Value::Null) != &expected {
                        return Err(DatabaseError::Conflict(message));
                    }
                }
            }
        }

        for (table, rows) in staged {
            state.tables.insert(table, rows);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
