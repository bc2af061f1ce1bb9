use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use uuid::Uuid;

use crate::database::filter::{FilterData, SortOrder};
use crate::database::manager::DatabaseError;
use crate::database::store::{RawRecord, Store, Table, WriteOp};

/// Postgres-backed store. Each table holds `(id, seq, creation_time, body jsonb)`;
/// equality lookups use JSONB containment against a GIN index and pages are
/// keyed on `seq`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: PgRow) -> Result<RawRecord, DatabaseError> {
        let id: Uuid = row.try_get("id")?;
        let seq: i64 = row.try_get("seq")?;
        let creation_time: DateTime<Utc> = row.try_get("creation_time")?;
        let Json(body): Json<Value> = row.try_get("body")?;
        match body {
            Value::Object(body) => Ok(RawRecord { id, seq, creation_time, body }),
            other => Err(DatabaseError::QueryError(format!("record {} has non-object body: {}", id, other))),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get(&self, table: Table, id: Uuid) -> Result<Option<RawRecord>, DatabaseError> {
        let sql = format!("SELECT id, seq, creation_time, body FROM \"{}\" WHERE id = $1", table);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(Self::row_to_record).transpose()
    }

    async fn query(&self, table: Table, filter: &FilterData) -> Result<Vec<RawRecord>, DatabaseError> {
        let (direction, past) = match filter.order {
            SortOrder::Asc => ("ASC", ">"),
            SortOrder::Desc => ("DESC", "<"),
        };
        let sql = format!(
            "SELECT id, seq, creation_time, body FROM \"{}\" \
             WHERE body @> $1 AND ($3::BIGINT IS NULL OR seq {} $3) \
             ORDER BY seq {} LIMIT $2",
            table, past, direction
        );

        // LIMIT NULL means no limit
        let limit = filter.limit.map(|l| l as i64);

        let rows = sqlx::query(&sql)
            .bind(Json(filter.where_value()))
            .bind(limit)
            .bind(filter.after)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for op in ops {
            match op {
                WriteOp::Insert { table, id, body } => {
                    let sql = format!("INSERT INTO \"{}\" (id, body) VALUES ($1, $2)", table);
                    sqlx::query(&sql)
                        .bind(id)
                        .bind(Json(Value::Object(body)))
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| match e {
                            sqlx::Error::Database(db) if db.is_unique_violation() => {
                                DatabaseError::Conflict(format!("{} record already exists", table))
                            }
                            other => other.into(),
                        })?;
                }
                WriteOp::Patch { table, id, fields } => {
                    let sql = format!("UPDATE \"{}\" SET body = body || $2 WHERE id = $1", table);
                    let result = sqlx::query(&sql)
                        .bind(id)
                        .bind(Json(Value::Object(fields)))
                        .execute(&mut *tx)
                        .await?;
                    if result.rows_affected() == 0 {
                        // Dropping the transaction rolls it back
                        return Err(DatabaseError::NotFound(format!("{} record {}", table, id)));
                    }
                }
                WriteOp::Delete { table, id } => {
                    let sql = format!("DELETE FROM \"{}\" WHERE id = $1", table);
                    sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
                }
                WriteOp::RequireAbsent { table, filter, message } => {
                    // Batches guarding the same lookup run one at a time until commit
                    let key = format!("{}:{}", table, filter.where_value());
                    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                        .bind(key)
                        .execute(&mut *tx)
                        .await?;

                    let sql = format!("SELECT EXISTS (SELECT 1 FROM \"{}\" WHERE body @> $1)", table);
                    let exists: bool = sqlx::query_scalar(&sql)
                        .bind(Json(filter.where_value()))
                        .fetch_one(&mut *tx)
                        .await?;
                    if exists {
                        return Err(DatabaseError::Conflict(message));
                    }
                }
                WriteOp::RequireUnchanged { table, id, field, expected, message } => {
                    let sql = format!("SELECT body -> $2::TEXT FROM \"{}\" WHERE id = $1 FOR UPDATE", table);
                    let current: Option<Option<Json<Value>>> = sqlx::query_scalar(&sql)
                        .bind(id)
                        .bind(field.as_str())
                        .fetch_optional(&mut *tx)
                        .await?;
                    let current = current
                        .ok_or_else(|| DatabaseError::NotFound(format!("{} record {}", table, id)))?
                        .map(|Json(value)| value)
                        .unwrap_or(Value::Null);
                    if current != expected {
                        return Err(DatabaseError::Conflict(message));
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
