//! PostgreSQL-backed [`RecordStore`].
//!
//! Items live in a single table `(pk TEXT PRIMARY KEY, item JSONB NOT NULL)`
//! whose name is only known at runtime, so the queries are built with
//! `sqlx::query` rather than the checked macros.

use std::fmt;

use async_trait::async_trait;
use kanau::processor::Processor;
use serde_json::Value;

use super::{Condition, Item, RecordStore, StoreError, item_key};
use crate::framework::DatabaseProcessor;

/// Postgres truncates identifiers longer than this.
const MAX_IDENTIFIER_BYTES: usize = 63;

/// A table name that is always emitted as a quoted identifier.
///
/// Provisioned names such as `Stack-OrdersTable1A2B-XYZ` are accepted; only
/// what could break out of the quotes (`"`, control characters) or would be
/// truncated is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() || name.len() > MAX_IDENTIFIER_BYTES {
            return None;
        }
        if name.chars().any(|c| c == '"' || c.is_control()) {
            return None;
        }
        Some(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

#[derive(Debug, Clone)]
/// Create the record table if it does not exist.
pub struct EnsureRecordTable {
    pub table: TableName,
}

#[derive(Debug, Clone)]
/// Fetch the item stored under a key.
pub struct GetRecordItem {
    pub table: TableName,
    pub key: String,
}

#[derive(Debug, Clone)]
/// Insert or replace an item.
pub struct UpsertRecordItem {
    pub table: TableName,
    pub key: String,
    pub item: Value,
}

#[derive(Debug, Clone)]
/// Insert an item only when no row has its key. Returns whether it was written.
pub struct InsertRecordItemIfAbsent {
    pub table: TableName,
    pub key: String,
    pub item: Value,
}

#[derive(Debug, Clone)]
/// Replace an item only when one of its attributes has the expected value.
/// Returns whether it was written.
pub struct ReplaceRecordItemIfAttribute {
    pub table: TableName,
    pub key: String,
    pub item: Value,
    pub attribute: String,
    pub expected: Value,
}

#[derive(Debug, Clone)]
/// Replace an item only when it exists without the given attribute.
/// Returns whether it was written.
pub struct ReplaceRecordItemIfAttributeAbsent {
    pub table: TableName,
    pub key: String,
    pub item: Value,
    pub attribute: String,
}

impl Processor<EnsureRecordTable> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:EnsureRecordTable")]
    async fn process(&self, cmd: EnsureRecordTable) -> Result<(), sqlx::Error> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (pk TEXT PRIMARY KEY, item JSONB NOT NULL)",
            cmd.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

impl Processor<GetRecordItem> for DatabaseProcessor {
    type Output = Option<Value>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetRecordItem")]
    async fn process(&self, query: GetRecordItem) -> Result<Option<Value>, sqlx::Error> {
        let sql = format!("SELECT item FROM {} WHERE pk = $1", query.table);
        sqlx::query_scalar::<_, Value>(&sql)
            .bind(query.key)
            .fetch_optional(&self.pool)
            .await
    }
}

impl Processor<UpsertRecordItem> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertRecordItem")]
    async fn process(&self, cmd: UpsertRecordItem) -> Result<(), sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO {} (pk, item) VALUES ($1, $2)
            ON CONFLICT (pk) DO UPDATE SET item = EXCLUDED.item
            "#,
            cmd.table
        );
        sqlx::query(&sql)
            .bind(cmd.key)
            .bind(cmd.item)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl Processor<InsertRecordItemIfAbsent> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertRecordItemIfAbsent")]
    async fn process(&self, cmd: InsertRecordItemIfAbsent) -> Result<bool, sqlx::Error> {
        let sql = format!(
            "INSERT INTO {} (pk, item) VALUES ($1, $2) ON CONFLICT (pk) DO NOTHING",
            cmd.table
        );
        let result = sqlx::query(&sql)
            .bind(cmd.key)
            .bind(cmd.item)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

impl Processor<ReplaceRecordItemIfAttribute> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ReplaceRecordItemIfAttribute")]
    async fn process(&self, cmd: ReplaceRecordItemIfAttribute) -> Result<bool, sqlx::Error> {
        // jsonb equality compares numbers by value
        let sql = format!(
            "UPDATE {} SET item = $2 WHERE pk = $1 AND item -> $3 = $4",
            cmd.table
        );
        let result = sqlx::query(&sql)
            .bind(cmd.key)
            .bind(cmd.item)
            .bind(cmd.attribute)
            .bind(cmd.expected)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

impl Processor<ReplaceRecordItemIfAttributeAbsent> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ReplaceRecordItemIfAttributeAbsent")]
    async fn process(&self, cmd: ReplaceRecordItemIfAttributeAbsent) -> Result<bool, sqlx::Error> {
        let sql = format!(
            "UPDATE {} SET item = $2 WHERE pk = $1 AND NOT (item ? $3)",
            cmd.table
        );
        let result = sqlx::query(&sql)
            .bind(cmd.key)
            .bind(cmd.item)
            .bind(cmd.attribute)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// [`RecordStore`] over one PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    db: DatabaseProcessor,
    table: TableName,
}

impl PgRecordStore {
    pub fn new(db: DatabaseProcessor, table: TableName) -> Self {
        Self { db, table }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create the backing table when missing.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        self.db
            .process(EnsureRecordTable {
                table: self.table.clone(),
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get_item(&self, key: &str) -> Result<Option<Item>, StoreError> {
        let stored = self
            .db
            .process(GetRecordItem {
                table: self.table.clone(),
                key: key.to_owned(),
            })
            .await?;
        match stored {
            None => Ok(None),
            Some(Value::Object(item)) => Ok(Some(item)),
            Some(_) => Err(StoreError::Corrupt {
                key: key.to_owned(),
            }),
        }
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        let key = item_key(&item)?.to_owned();
        self.db
            .process(UpsertRecordItem {
                table: self.table.clone(),
                key,
                item: Value::Object(item),
            })
            .await?;
        Ok(())
    }

    async fn put_item_if(&self, item: Item, condition: Condition) -> Result<(), StoreError> {
        let key = item_key(&item)?.to_owned();
        let written = match condition {
            Condition::NotExists => {
                self.db
                    .process(InsertRecordItemIfAbsent {
                        table: self.table.clone(),
                        key: key.clone(),
                        item: Value::Object(item),
                    })
                    .await?
            }
            Condition::AttributeEquals { name, value } => {
                self.db
                    .process(ReplaceRecordItemIfAttribute {
                        table: self.table.clone(),
                        key: key.clone(),
                        item: Value::Object(item),
                        attribute: name,
                        expected: value,
                    })
                    .await?
            }
            Condition::AttributeNotExists { name } => {
                self.db
                    .process(ReplaceRecordItemIfAttributeAbsent {
                        table: self.table.clone(),
                        key: key.clone(),
                        item: Value::Object(item),
                        attribute: name,
                    })
                    .await?
            }
        };
        if written {
            Ok(())
        } else {
            Err(StoreError::ConditionFailed { key })
        }
    }
}
