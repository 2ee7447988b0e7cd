//! Row permission: the caller's permission value, the conditions it adds to queries and the
//! per-row `forbid` flags returned with list results.

use crate::config::{AuthOperate, CompareMethod, RowPermission};
use crate::error::{AppError, ConfigError};
use crate::query::{matches_all, Condition, Operator};
use async_trait::async_trait;
use axum::http::{Extensions, HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Request data handed to permission providers and custom handlers.
#[derive(Clone, Debug, Default)]
pub struct RequestMeta {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Values inserted by middleware (e.g. an authenticated user).
    pub extensions: Extensions,
}

/// Permission of the caller: one value for single-column permissions, or a value per column alias.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionValue {
    Single(String),
    Record(Map<String, Value>),
}

impl Default for PermissionValue {
    fn default() -> Self {
        PermissionValue::Single(String::new())
    }
}

#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn permission(&self, meta: &RequestMeta) -> Result<PermissionValue, AppError>;
}

#[async_trait]
impl<F> PermissionProvider for F
where
    F: Fn(&RequestMeta) -> Result<PermissionValue, AppError> + Send + Sync,
{
    async fn permission(&self, meta: &RequestMeta) -> Result<PermissionValue, AppError> {
        self(meta)
    }
}

/// Reads the permission value from a request header (e.g. `X-User-ID`). Missing header is an empty value.
#[derive(Clone, Debug)]
pub struct HeaderPermission(pub String);

#[async_trait]
impl PermissionProvider for HeaderPermission {
    async fn permission(&self, meta: &RequestMeta) -> Result<PermissionValue, AppError> {
        let value = meta
            .headers
            .get(self.0.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        Ok(PermissionValue::Single(value))
    }
}

/// A table's row permission bound to one caller.
#[derive(Clone, Debug)]
pub struct PermissionGuard<'a> {
    table: &'a str,
    rule: Option<&'a RowPermission>,
    value: PermissionValue,
}

impl<'a> PermissionGuard<'a> {
    pub fn new(table: &'a str, rule: Option<&'a RowPermission>, value: PermissionValue) -> Self {
        PermissionGuard { table, rule, value }
    }

    pub fn value(&self) -> &PermissionValue {
        &self.value
    }

    /// All permission conditions of the rule, regardless of which operations it protects.
    /// `None` when a record value lacks one of the permission columns: such a caller owns nothing.
    fn rule_conditions(&self, rule: &RowPermission) -> Result<Option<Vec<Condition>>, AppError> {
        let op = match rule.compare {
            CompareMethod::Equal => Operator::Eq,
            CompareMethod::Contains => Operator::Like,
        };
        match &self.value {
            PermissionValue::Single(v) => {
                if rule.columns.len() > 1 {
                    return Err(ConfigError::PermissionShape(self.table.to_string()).into());
                }
                Ok(Some(
                    rule.columns
                        .iter()
                        .map(|c| Condition::new(c.clone(), op, Value::String(v.clone())))
                        .collect(),
                ))
            }
            PermissionValue::Record(m) => Ok(rule
                .columns
                .iter()
                .map(|c| {
                    m.get(c)
                        .filter(|v| !v.is_null())
                        .map(|v| Condition::new(c.clone(), op, v.clone()))
                })
                .collect()),
        }
    }

    /// Conditions to AND into the where clause of `op`. Empty when `op` is not protected.
    pub fn conditions(&self, op: AuthOperate) -> Result<Vec<Condition>, AppError> {
        match self.rule {
            Some(rule) if rule.protects(op) => self.rule_conditions(rule)?.ok_or_else(|| {
                tracing::warn!(table = %self.table, "permission value lacks a permission column");
                AppError::Forbidden(format!("no permission value for {}", self.table))
            }),
            _ => Ok(Vec::new()),
        }
    }

    /// Add `forbid: { update, delete }` to every row of a list result.
    pub fn append(&self, rows: &mut [Map<String, Value>]) -> Result<(), AppError> {
        let Some(rule) = self.rule else {
            return Ok(());
        };
        let update = rule.protects(AuthOperate::Update);
        let delete = rule.protects(AuthOperate::Delete);
        let conds = if update || delete {
            self.rule_conditions(rule)?
        } else {
            Some(Vec::new())
        };
        for row in rows.iter_mut() {
            let permitted = conds.as_deref().map(|c| matches_all(c, row)).unwrap_or(false);
            let forbid = json!({
                "update": !permitted && update,
                "delete": !permitted && delete,
            });
            row.insert("forbid".into(), forbid);
        }
        Ok(())
    }

    /// Fill missing permission columns of a new row with the caller's value; reject rows created
    /// on behalf of someone else.
    pub fn prepare_create(&self, body: &mut Map<String, Value>) -> Result<(), AppError> {
        let conds = self.conditions(AuthOperate::Create)?;
        for cond in &conds {
            if body.get(&cond.field).map(Value::is_null).unwrap_or(true) {
                body.insert(cond.field.clone(), cond.value.clone());
            }
        }
        if !matches_all(&conds, body) {
            return Err(AppError::Forbidden(format!("cannot create this {} row", self.table)));
        }
        Ok(())
    }
}
