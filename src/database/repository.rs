use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::filter::FilterData;
use crate::database::manager::DatabaseError;
use crate::database::store::{RawRecord, Store, Table, WriteOp};
use crate::types::{Page, PageRequest};

/// A typed record living in one table.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: Table;
}

/// Records that belong to a team.
pub trait TeamScoped {
    fn team_id(&self) -> Uuid;
}

/// A record together with its system fields, serialized as
/// `{ "_id": .., "_creationTime": .., ...fields }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stored<T> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "_creationTime")]
    pub creation_time: DateTime<Utc>,
    #[serde(skip)]
    pub seq: i64,
    #[serde(flatten)]
    pub data: T,
}

impl<T> std::ops::Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T: Record> TryFrom<RawRecord> for Stored<T> {
    type Error = DatabaseError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let data = serde_json::from_value(Value::Object(raw.body))?;
        Ok(Stored { id: raw.id, creation_time: raw.creation_time, seq: raw.seq, data })
    }
}

pub(crate) fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::QueryError(format!("expected an object, got {}", other))),
    }
}

/// Typed read access plus single-record writes for one table.
pub struct Repository<T> {
    store: Arc<dyn Store>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Record> Repository<T> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Stored<T>>, DatabaseError> {
        self.store.get(T::TABLE, id).await?.map(Stored::try_from).transpose()
    }

    pub async fn select_404(&self, id: Uuid) -> Result<Stored<T>, DatabaseError> {
        self.get(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} record {}", T::TABLE, id)))
    }

    pub async fn select_any(&self, filter: FilterData) -> Result<Vec<Stored<T>>, DatabaseError> {
        self.store
            .query(T::TABLE, &filter)
            .await?
            .into_iter()
            .map(Stored::try_from)
            .collect()
    }

    pub async fn select_one(&self, filter: FilterData) -> Result<Option<Stored<T>>, DatabaseError> {
        Ok(self.select_any(filter.limit(1)).await?.into_iter().next())
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<Stored<T>>, DatabaseError> {
        let lookups = ids.iter().map(|id| self.get(*id));
        let found = futures::future::try_join_all(lookups).await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// Keyset pagination: each page resumes strictly past the last record of
    /// the previous one, so writes between fetches neither repeat nor skip rows.
    pub async fn paginate(&self, filter: FilterData, request: &PageRequest) -> Result<Page<Stored<T>>, DatabaseError> {
        let mut page = self
            .select_any(filter.after(request.after()).limit(request.num_items + 1))
            .await?;

        let is_done = page.len() <= request.num_items;
        page.truncate(request.num_items);
        let continue_cursor = if is_done {
            None
        } else {
            page.last().map(|last| last.seq.to_string())
        };

        Ok(Page { page, is_done, continue_cursor })
    }

    pub async fn insert(&self, data: &T) -> Result<Uuid, DatabaseError> {
        let mut batch = WriteBatch::new();
        let id = batch.insert(data)?;
        batch.commit(self.store.as_ref()).await?;
        Ok(id)
    }

    pub async fn patch<P: Serialize>(&self, id: Uuid, patch: &P) -> Result<(), DatabaseError> {
        let mut batch = WriteBatch::new();
        batch.patch::<T, P>(id, patch)?;
        batch.commit(self.store.as_ref()).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut batch = WriteBatch::new();
        batch.delete::<T>(id);
        batch.commit(self.store.as_ref()).await
    }
}

/// Writes collected for one atomic commit. Ids are assigned on insert so
/// later operations in the same batch can reference them.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Record>(&mut self, data: &T) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        self.ops.push(WriteOp::Insert { table: T::TABLE, id, body: to_object(data)? });
        Ok(id)
    }

    pub fn patch<T: Record, P: Serialize>(&mut self, id: Uuid, patch: &P) -> Result<(), DatabaseError> {
        let fields = to_object(patch)?;
        if !fields.is_empty() {
            self.ops.push(WriteOp::Patch { table: T::TABLE, id, fields });
        }
        Ok(())
    }

    /// Patch with an explicit field map, used to clear optional references.
    pub fn patch_fields(&mut self, table: Table, id: Uuid, fields: Map<String, Value>) {
        if !fields.is_empty() {
            self.ops.push(WriteOp::Patch { table, id, fields });
        }
    }

    /// Abort the commit with `Conflict(message)` if a `T` matching `filter`
    /// exists when the batch is applied.
    pub fn require_absent<T: Record>(&mut self, filter: FilterData, message: impl Into<String>) {
        self.ops.push(WriteOp::RequireAbsent { table: T::TABLE, filter, message: message.into() });
    }

    /// Abort the commit with `Conflict(message)` unless `field` of record `id`
    /// still holds `expected` when the batch is applied.
    pub fn require_unchanged<T: Record, V: Serialize>(
        &mut self,
        id: Uuid,
        field: &str,
        expected: &V,
        message: impl Into<String>,
    ) -> Result<(), DatabaseError> {
        self.ops.push(WriteOp::RequireUnchanged {
            table: T::TABLE,
            id,
            field: field.to_string(),
            expected: serde_json::to_value(expected)?,
            message: message.into(),
        });
        Ok(())
    }

    pub fn delete<T: Record>(&mut self, id: Uuid) {
        self.delete_raw(T::TABLE, id);
    }

    pub fn delete_raw(&mut self, table: Table, id: Uuid) {
        self.ops.push(WriteOp::Delete { table, id });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub async fn commit(self, store: &dyn Store) -> Result<(), DatabaseError> {
        if self.ops.is_empty() {
            return Ok(());
        }
        store.write(self.ops).await
    }
}
