//! PostgreSQL `Dao` on a sqlx pool.

use super::{Dao, Page, Record};
use crate::config::ResolvedTable;
use crate::error::AppError;
use crate::query::{Condition, PageParams, Pagination};
use crate::sql::{count, delete, insert, select_list, select_one, update, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgColumn, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct PgDao {
    pool: PgPool,
    table: Arc<ResolvedTable>,
}

impl PgDao {
    pub fn new(pool: PgPool, table: Arc<ResolvedTable>) -> Self {
        PgDao { pool, table }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn bind(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    async fn fetch_many(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        let rows = Self::bind(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Record>, AppError> {
        let row = Self::bind(q).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_record))
    }
}

fn joined<'a>(a: &'a [Condition], b: &'a [Condition]) -> Vec<&'a Condition> {
    a.iter().chain(b.iter()).collect()
}

#[async_trait]
impl Dao for PgDao {
    async fn all(&self, filter: &[Condition]) -> Result<Vec<Record>, AppError> {
        let q = select_list(&self.table, &joined(filter, &[]), None, None, None)?;
        self.fetch_many(&q).await
    }

    async fn paginate(&self, filter: &[Condition], page: &PageParams) -> Result<Page, AppError> {
        let conds = joined(filter, &[]);
        let cq = count(&self.table, &conds)?;
        tracing::debug!(sql = %cq.sql, params = ?cq.params, "query");
        let mut count_query = sqlx::query_scalar::<_, i64>(&cq.sql);
        for p in &cq.params {
            count_query = count_query.bind(PgBindValue::from_json(p));
        }
        let total = count_query.fetch_one(&self.pool).await?.max(0) as u64;

        let q = select_list(
            &self.table,
            &conds,
            page.order_by.as_ref(),
            Some(page.page_size),
            Some(page.offset()),
        )?;
        let data = self.fetch_many(&q).await?;
        let pagination = Pagination::new(page, total, data.len() as u64);
        Ok(Page { data, pagination })
    }

    async fn get_by_pk(&self, pk: &[Condition], permission: &[Condition]) -> Result<Option<Record>, AppError> {
        let q = select_one(&self.table, &joined(pk, permission))?;
        self.fetch_optional(&q).await
    }

    async fn create(&self, data: &Record) -> Result<Record, AppError> {
        let q = insert(&self.table, data);
        self.fetch_optional(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update_by_pk(
        &self,
        pk: &[Condition],
        permission: &[Condition],
        data: &Record,
    ) -> Result<Option<Record>, AppError> {
        let q = update(&self.table, &joined(pk, permission), data)?;
        self.fetch_optional(&q).await
    }

    async fn delete_by_pk(&self, pk: &[Condition], permission: &[Condition]) -> Result<u64, AppError> {
        let q = delete(&self.table, &joined(pk, permission))?;
        let res = Self::bind(&q).execute(&self.pool).await?;
        Ok(res.rows_affected())
    }
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::{Column, Row};
    let mut map = Record::new();
    for col in row.columns() {
        map.insert(col.name().to_string(), cell_to_value(row, col));
    }
    map
}

fn cell_to_value(row: &PgRow, col: &PgColumn) -> Value {
    use sqlx::{Column, Row, TypeInfo};
    let i = col.ordinal();
    let type_name = col.type_info().name();
    let decoded = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(i).map(|v| v.map(Value::from)),
        "INT4" => row.try_get::<Option<i32>, _>(i).map(|v| v.map(Value::from)),
        "INT8" => row.try_get::<Option<i64>, _>(i).map(|v| v.map(Value::from)),
        "FLOAT4" => row.try_get::<Option<f32>, _>(i).map(|v| v.map(Value::from)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(i).map(|v| v.map(Value::from)),
        "BOOL" => row.try_get::<Option<bool>, _>(i).map(|v| v.map(Value::from)),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(i)
            .map(|v| v.map(|u| Value::String(u.to_string()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)
            .map(|v| v.map(|d| Value::String(d.to_rfc3339()))),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(i)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S%.f").to_string()))),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(i)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(i),
        _ => row.try_get::<Option<String>, _>(i).map(|v| v.map(Value::String)),
    };
    match decoded {
        Ok(v) => v.unwrap_or(Value::Null),
        Err(e) => {
            tracing::warn!(column = col.name(), pg_type = type_name, error = %e, "column not decoded, set to null");
            Value::Null
        }
    }
}

/// Column types of a table in the current schema, spelled as casts accept them.
pub async fn column_types(pool: &PgPool, table_name: &str) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT column_name::text, data_type::text, udt_name::text FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1",
    )
    .bind(table_name)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(name, data_type, udt)| {
            let pg_type = match data_type.as_str() {
                "ARRAY" => format!("{}[]", udt.trim_start_matches('_')),
                "USER-DEFINED" => udt,
                _ => data_type,
            };
            (name, pg_type)
        })
        .collect())
}

/// Fill in the type of every column the schema left untyped, so bound text is cast to it.
pub async fn fill_column_types(pool: &PgPool, table: &mut ResolvedTable) -> Result<(), sqlx::Error> {
    if table.columns.iter().all(|c| c.pg_type.is_some()) {
        return Ok(());
    }
    let types = column_types(pool, &table.table_name).await?;
    if types.is_empty() {
        tracing::warn!(table = %table.table_name, "table not found, columns stay untyped");
        return Ok(());
    }
    for col in table.columns.iter_mut().filter(|c| c.pg_type.is_none()) {
        col.pg_type = types.get(&col.name).cloned();
    }
    Ok(())
}
