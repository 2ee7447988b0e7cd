//! Pagination and ordering parameters.

use crate::config::ResolvedTable;
use crate::error::AppError;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Ordering on an API field (alias).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Parse `field[,asc|desc]`; direction defaults to descending.
    pub fn parse(table: &ResolvedTable, raw: &str) -> Result<Self, AppError> {
        let (field, dir) = match raw.split_once(',') {
            Some((f, d)) => (f.trim(), Some(d.trim())),
            None => (raw.trim(), None),
        };
        if table.visible_column(field).is_none() {
            return Err(AppError::BadRequest(format!("cannot order by {}", field)));
        }
        let direction = match dir.map(str::to_lowercase).as_deref() {
            None | Some("") | Some("desc") => Direction::Desc,
            Some("asc") => Direction::Asc,
            Some(other) => return Err(AppError::BadRequest(format!("invalid order: {}", other))),
        };
        Ok(OrderBy {
            field: field.to_string(),
            direction,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub page_size: u64,
    pub order_by: Option<OrderBy>,
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: None,
        }
    }
}

impl PageParams {
    /// Read `page`, `pageSize` and `orderBy` from query parameters. Unparseable numbers fall back to defaults.
    pub fn from_query(table: &ResolvedTable, query: &HashMap<String, String>) -> Result<Self, AppError> {
        let page = query
            .get("page")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1)
            .max(1);
        let page_size = query
            .get("pageSize")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let in_range = (page - 1)
            .checked_mul(page_size)
            .map(|offset| offset <= i64::MAX as u64)
            .unwrap_or(false);
        if !in_range {
            return Err(AppError::BadRequest(format!("page out of range: {}", page)));
        }
        let order_by = match query.get("orderBy").filter(|v| !v.is_empty()) {
            Some(raw) => Some(OrderBy::parse(table, raw)?),
            None => None,
        };
        Ok(PageParams {
            page,
            page_size,
            order_by,
        })
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub from: u64,
    pub to: u64,
}

impl Pagination {
    pub fn new(params: &PageParams, total: u64, returned: u64) -> Self {
        let last_page = total.div_ceil(params.page_size).max(1);
        let from = params.offset();
        Pagination {
            total,
            last_page,
            per_page: params.page_size,
            current_page: params.page,
            from,
            to: from.saturating_add(returned),
        }
    }
}
