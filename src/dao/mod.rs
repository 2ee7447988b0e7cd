//! Data access per table. Records are JSON objects keyed by API alias.

mod pg;

use crate::error::AppError;
use crate::query::{Condition, PageParams, Pagination};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

pub use pg::{column_types, fill_column_types, PgDao};

pub type Record = Map<String, Value>;

/// One page of a list result.
#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub data: Vec<Record>,
    pub pagination: Pagination,
}

/// Table operations behind the generated handlers. `pk` holds one equality per key column,
/// `permission` the row-permission conditions of the caller; both are ANDed.
#[async_trait]
pub trait Dao: Send + Sync {
    async fn all(&self, filter: &[Condition]) -> Result<Vec<Record>, AppError>;

    async fn paginate(&self, filter: &[Condition], page: &PageParams) -> Result<Page, AppError>;

    async fn get_by_pk(&self, pk: &[Condition], permission: &[Condition]) -> Result<Option<Record>, AppError>;

    async fn create(&self, data: &Record) -> Result<Record, AppError>;

    async fn update_by_pk(
        &self,
        pk: &[Condition],
        permission: &[Condition],
        data: &Record,
    ) -> Result<Option<Record>, AppError>;

    /// Returns the number of rows deleted.
    async fn delete_by_pk(&self, pk: &[Condition], permission: &[Condition]) -> Result<u64, AppError>;
}
