//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from a resolved table.
//! Conditions and records use API aliases; they are mapped to column names here.

use crate::config::{ResolvedColumn, ResolvedTable};
use crate::error::AppError;
use crate::query::{as_text, Condition, Operator, OrderBy};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: Value) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }

    /// Placeholder for a value written into `col`: `NULL` literal, else `$n` bound as text and cast
    /// to the column type. Untyped columns get the JSON value as is.
    fn write_value(&mut self, col: &ResolvedColumn, v: &Value) -> String {
        if v.is_null() {
            return "NULL".into();
        }
        match col.pg_type.as_deref() {
            Some(t) => {
                let text = match v {
                    Value::Array(items) if t.trim_end().ends_with("[]") => array_literal(items),
                    _ => as_text(v),
                };
                let n = self.push_param(Value::String(text));
                format!("${}::{}", n, t)
            }
            None => format!("${}", self.push_param(v.clone())),
        }
    }

    /// Placeholder for a value compared with `col`. Values are bound as text and cast to the
    /// declared type; untyped columns are compared as text (see `compared_column`).
    fn compare_value(&mut self, col: &ResolvedColumn, v: &Value) -> String {
        let n = self.push_param(Value::String(as_text(v)));
        match col.pg_type.as_deref() {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

fn compared_column(col: &ResolvedColumn) -> String {
    match col.pg_type {
        Some(_) => quoted(&col.name),
        None => format!("{}::text", quoted(&col.name)),
    }
}

/// Escape LIKE wildcards so the value is matched literally.
fn like_pattern(v: &Value) -> Value {
    let raw = as_text(v)
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Value::String(format!("%{}%", raw))
}

/// Types the row decoder reads as they are.
const NATIVE_TYPES: &[&str] = &[
    "smallint", "int2", "integer", "int", "int4", "bigint", "int8", "smallserial", "serial2", "serial",
    "serial4", "bigserial", "serial8", "real", "float4", "double precision", "float8", "boolean", "bool",
    "uuid", "date", "timestamp", "timestamptz", "timestamp with time zone", "timestamp without time zone",
    "text", "varchar", "character varying", "char", "character", "bpchar", "name", "json", "jsonb",
];

/// SELECT list: visible columns as `"name" AS "alias"`. Arrays are read as JSON, other types
/// the decoder lacks (numeric, enums, intervals ...) as text. Untyped columns are left as is.
fn select_column_list(table: &ResolvedTable) -> String {
    table
        .visible_columns()
        .map(|c| {
            let q = quoted(&c.name);
            let expr = match c.base_type() {
                Some(t) if t.ends_with("[]") => format!("to_jsonb({})", q),
                Some(t) if !NATIVE_TYPES.contains(&t.as_str()) => format!("{}::text", q),
                _ => q,
            };
            format!("{} AS {}", expr, quoted(&c.alias))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// PostgreSQL array literal of a JSON array, elements quoted: `[1, "a b"]` is `{"1","a b"}`.
fn array_literal(items: &[Value]) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|v| match v {
            Value::Null => "NULL".to_string(),
            Value::Array(inner) => array_literal(inner),
            other => format!("\"{}\"", as_text(other).replace('\\', "\\\\").replace('"', "\\\"")),
        })
        .collect();
    format!("{{{}}}", parts.join(","))
}

fn render_condition(q: &mut QueryBuf, table: &ResolvedTable, cond: &Condition) -> Result<String, AppError> {
    let col = table
        .column(&cond.field)
        .ok_or_else(|| AppError::BadRequest(format!("unknown field: {}", cond.field)))?;
    let lhs = compared_column(col);
    Ok(match cond.op {
        Operator::Eq | Operator::Ne if cond.value.is_null() => {
            let not = if cond.op == Operator::Ne { " NOT" } else { "" };
            format!("{} IS{} NULL", quoted(&col.name), not)
        }
        Operator::Eq | Operator::Ne | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let ph = q.compare_value(col, &cond.value);
            format!("{} {} {}", lhs, cond.op.sql(), ph)
        }
        Operator::Like => {
            let n = q.push_param(like_pattern(&cond.value));
            format!("{}::text LIKE ${}", quoted(&col.name), n)
        }
        Operator::In => {
            let items = cond.value.as_array().cloned().unwrap_or_else(|| vec![cond.value.clone()]);
            if items.is_empty() {
                return Ok("1 = 0".into());
            }
            let phs: Vec<String> = items.iter().map(|v| q.compare_value(col, v)).collect();
            format!("{} IN ({})", lhs, phs.join(", "))
        }
        Operator::Between => match cond.value.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                let a = q.compare_value(col, low);
                let b = q.compare_value(col, high);
                format!("{} BETWEEN {} AND {}", lhs, a, b)
            }
            _ => {
                return Err(AppError::BadRequest(format!(
                    "{}: between expects two values",
                    cond.field
                )))
            }
        },
    })
}

/// ` WHERE a AND b ...`, or empty when there are no conditions.
fn where_clause(q: &mut QueryBuf, table: &ResolvedTable, conds: &[&Condition]) -> Result<String, AppError> {
    let mut parts = Vec::with_capacity(conds.len());
    for c in conds {
        parts.push(render_condition(q, table, c)?);
    }
    Ok(if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    })
}

fn order_clause(table: &ResolvedTable, order: Option<&OrderBy>) -> Result<String, AppError> {
    match order {
        Some(o) => {
            let col = table
                .visible_column(&o.field)
                .ok_or_else(|| AppError::BadRequest(format!("cannot order by {}", o.field)))?;
            Ok(format!(" ORDER BY {} {}", quoted(&col.name), o.direction.sql()))
        }
        None => {
            let keys: Vec<String> = table
                .pk
                .iter()
                .filter_map(|a| table.column(a))
                .map(|c| quoted(&c.name))
                .collect();
            Ok(format!(" ORDER BY {}", keys.join(", ")))
        }
    }
}

/// SELECT rows matching all conditions, ordered by `order` or the primary key, optionally paged.
pub fn select_list(
    table: &ResolvedTable,
    conds: &[&Condition],
    order: Option<&OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, conds)?;
    let order_sql = order_clause(table, order)?;
    let limit_sql = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_sql = offset.filter(|n| *n > 0).map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        select_column_list(table),
        quoted(&table.table_name),
        where_sql,
        order_sql,
        limit_sql,
        offset_sql
    );
    Ok(q)
}

/// SELECT count(*) AS total with the same conditions as `select_list`.
pub fn count(table: &ResolvedTable, conds: &[&Condition]) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, conds)?;
    q.sql = format!("SELECT count(*) AS total FROM {}{}", quoted(&table.table_name), where_sql);
    Ok(q)
}

/// SELECT one row (LIMIT 1).
pub fn select_one(table: &ResolvedTable, conds: &[&Condition]) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, conds)?;
    q.sql = format!(
        "SELECT {} FROM {}{} LIMIT 1",
        select_column_list(table),
        quoted(&table.table_name),
        where_sql
    );
    Ok(q)
}

/// INSERT the visible fields present in `data`; other keys are dropped. Returns the row.
pub fn insert(table: &ResolvedTable, data: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for c in table.visible_columns() {
        let Some(v) = data.get(&c.alias) else { continue };
        values.push(q.write_value(c, v));
        cols.push(quoted(&c.name));
    }
    let returning = select_column_list(table);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(&table.table_name),
            returning
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(&table.table_name),
            cols.join(", "),
            values.join(", "),
            returning
        )
    };
    q
}

/// UPDATE the visible non-key fields present in `data` on rows matching `conds`. Returns the row.
pub fn update(
    table: &ResolvedTable,
    conds: &[&Condition],
    data: &Map<String, Value>,
) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in table.visible_columns() {
        if table.pk.contains(&c.alias) {
            continue;
        }
        let Some(v) = data.get(&c.alias) else { continue };
        let rhs = q.write_value(c, v);
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    if sets.is_empty() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }
    let where_sql = where_clause(&mut q, table, conds)?;
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        quoted(&table.table_name),
        sets.join(", "),
        where_sql,
        select_column_list(table)
    );
    Ok(q)
}

/// DELETE rows matching `conds`.
pub fn delete(table: &ResolvedTable, conds: &[&Condition]) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, conds)?;
    q.sql = format!("DELETE FROM {}{}", quoted(&table.table_name), where_sql);
    Ok(q)
}
