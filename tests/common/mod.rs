//! In-memory `Dao` and request helpers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use easycrud::config::{parse_schemas, ResolvedTable, TableSchema};
use easycrud::query::{as_text, matches_all, Direction};
use easycrud::{AppError, Condition, Dao, Page, PageParams, Pagination, Record};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub struct MockDao {
    table: Arc<ResolvedTable>,
    rows: Mutex<Vec<Record>>,
}

impl MockDao {
    pub fn new(table: Arc<ResolvedTable>, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(m) => Some(m),
                _ => None,
            })
            .collect();
        MockDao {
            table,
            rows: Mutex::new(rows),
        }
    }

    pub fn rows(&self) -> Vec<Record> {
        self.rows.lock().unwrap().clone()
    }

    fn matching(&self, conds: &[&[Condition]]) -> Vec<Record> {
        let all: Vec<Condition> = conds.iter().flat_map(|c| c.iter().cloned()).collect();
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| matches_all(&all, r))
            .cloned()
            .collect()
    }
}

fn order(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => as_text(a).cmp(&as_text(b)),
    }
}

#[async_trait]
impl Dao for MockDao {
    async fn all(&self, filter: &[Condition]) -> Result<Vec<Record>, AppError> {
        Ok(self.matching(&[filter]))
    }

    async fn paginate(&self, filter: &[Condition], page: &PageParams) -> Result<Page, AppError> {
        let mut rows = self.matching(&[filter]);
        if let Some(ob) = &page.order_by {
            rows.sort_by(|a, b| {
                let o = order(
                    a.get(&ob.field).unwrap_or(&Value::Null),
                    b.get(&ob.field).unwrap_or(&Value::Null),
                );
                match ob.direction {
                    Direction::Asc => o,
                    Direction::Desc => o.reverse(),
                }
            });
        }
        let total = rows.len() as u64;
        let data: Vec<Record> = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();
        let pagination = Pagination::new(page, total, data.len() as u64);
        Ok(Page { data, pagination })
    }

    async fn get_by_pk(&self, pk: &[Condition], permission: &[Condition]) -> Result<Option<Record>, AppError> {
        Ok(self.matching(&[pk, permission]).into_iter().next())
    }

    async fn create(&self, data: &Record) -> Result<Record, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let mut row = data.clone();
        for key in &self.table.pk {
            if !row.contains_key(key) {
                let next = rows.iter().filter_map(|r| r.get(key).and_then(Value::as_i64)).max().unwrap_or(0) + 1;
                row.insert(key.clone(), json!(next));
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update_by_pk(
        &self,
        pk: &[Condition],
        permission: &[Condition],
        data: &Record,
    ) -> Result<Option<Record>, AppError> {
        let all: Vec<Condition> = pk.iter().chain(permission).cloned().collect();
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| matches_all(&all, r)) else {
            return Ok(None);
        };
        for (k, v) in data {
            if !self.table.pk.contains(k) {
                row.insert(k.clone(), v.clone());
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete_by_pk(&self, pk: &[Condition], permission: &[Condition]) -> Result<u64, AppError> {
        let all: Vec<Condition> = pk.iter().chain(permission).cloned().collect();
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !matches_all(&all, r));
        Ok((before - rows.len()) as u64)
    }
}

pub fn schemas() -> Vec<TableSchema> {
    parse_schemas(
        r#"[
            {"tableName": "users", "columns": [{"name": "id", "type": "int4"}, {"name": "name"}, {"name": "org_id"}], "pk": ["id"]},
            {"tableName": "posts", "columns": [{"name": "id"}, {"name": "title"}, {"name": "owner_id"}], "pk": ["id"],
             "options": {"rowPermission": {"column": "owner_id", "operates": ["update", "delete", "create"]}}}
        ]"#,
    )
    .unwrap()
}

pub fn fixtures(table: &str) -> Vec<Value> {
    match table {
        "users" => vec![
            json!({"id": 1, "name": "alice", "orgId": 10}),
            json!({"id": 2, "name": "bob", "orgId": 20}),
        ],
        "posts" => vec![
            json!({"id": 1, "title": "mine", "ownerId": "u1"}),
            json!({"id": 2, "title": "theirs", "ownerId": "u2"}),
        ],
        _ => Vec::new(),
    }
}

pub async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>, user: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header("x-user-id", user);
    }
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
