//! Query-string filters: `field=value` or `field:operator=value` into typed conditions.

use crate::config::ResolvedTable;
use crate::error::AppError;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

/// Query keys consumed by pagination and ordering, never treated as filters.
pub const RESERVED_KEYS: &[&str] = &["page", "pageSize", "orderBy"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    /// Containment: the column's text contains the value.
    Like,
    Between,
}

impl FromStr for Operator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            "like" => Operator::Like,
            "between" => Operator::Between,
            _ => return Err(AppError::BadRequest(format!("unknown operator: {}", s))),
        })
    }
}

impl Operator {
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::Like => "LIKE",
            Operator::Between => "BETWEEN",
        }
    }
}

/// One where-clause term on an API field (alias). `In` and `Between` carry an array value.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Condition {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Condition::new(field, Operator::Eq, value)
    }

    /// Evaluate against a record keyed by alias. Missing and null fields never match, as in SQL.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        let Some(v) = record.get(&self.field).filter(|v| !v.is_null()) else {
            return false;
        };
        match self.op {
            Operator::Eq => loose_eq(v, &self.value),
            Operator::Ne => !loose_eq(v, &self.value),
            Operator::Gt => compare(v, &self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(compare(v, &self.value), Some(Ordering::Greater | Ordering::Equal)),
            Operator::Lt => compare(v, &self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(compare(v, &self.value), Some(Ordering::Less | Ordering::Equal)),
            Operator::In => self
                .value
                .as_array()
                .map(|arr| arr.iter().any(|a| loose_eq(v, a)))
                .unwrap_or(false),
            Operator::Like => as_text(v).contains(&as_text(&self.value)),
            Operator::Between => match self.value.as_array().map(Vec::as_slice) {
                Some([low, high]) => {
                    matches!(compare(v, low), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(compare(v, high), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            },
        }
    }
}

pub fn matches_all(conditions: &[Condition], record: &Map<String, Value>) -> bool {
    conditions.iter().all(|c| c.matches(record))
}

pub fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return false;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    as_text(a) == as_text(b)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    Some(as_text(a).cmp(&as_text(b)))
}

fn split_list(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .collect()
}

/// Build conditions from query parameters. Only visible fields of `table` are used; empty
/// values, reserved keys and unknown fields are skipped. Output is ordered by key.
pub fn parse_conditions(
    table: &ResolvedTable,
    query: &HashMap<String, String>,
) -> Result<Vec<Condition>, AppError> {
    let mut keys: Vec<&String> = query.keys().collect();
    keys.sort();

    let mut out = Vec::new();
    for key in keys {
        let raw = query[key].as_str();
        if raw.is_empty() || RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let (field, op) = match key.split_once(':') {
            Some((f, op)) => (f, op.parse::<Operator>()?),
            None => (key.as_str(), Operator::Eq),
        };
        let Some(column) = table.visible_column(field) else {
            continue;
        };
        let value = match op {
            Operator::In => {
                let items = split_list(raw);
                if items.is_empty() {
                    continue;
                }
                Value::Array(items)
            }
            Operator::Between => {
                let items = split_list(raw);
                if items.len() != 2 {
                    return Err(AppError::BadRequest(format!(
                        "{}: between expects two comma separated values",
                        field
                    )));
                }
                Value::Array(items)
            }
            _ => Value::String(raw.to_string()),
        };
        if op != Operator::Like {
            let items = value.as_array().cloned().unwrap_or_else(|| vec![value.clone()]);
            if let Some(bad) = items.iter().map(as_text).find(|v| !column.accepts(v)) {
                return Err(AppError::BadRequest(format!("{}: invalid value '{}'", field, bad)));
            }
        }
        out.push(Condition::new(field, op, value));
    }
    Ok(out)
}
