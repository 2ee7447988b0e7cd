//! Resolved table model: schemas validated and flattened for runtime use.

use crate::config::{validate, AuthOperate, CompareMethod, TableSchema};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct ResolvedColumn {
    /// Database column name.
    pub name: String,
    /// API field name.
    pub alias: String,
    pub hidden: bool,
    /// PostgreSQL type for casts on bound values.
    pub pg_type: Option<String>,
}

impl ResolvedColumn {
    /// Lowercased type without modifiers: `numeric(10,2)` is `numeric`, `varchar(20)[]` is `varchar[]`.
    pub fn base_type(&self) -> Option<String> {
        let t = self.pg_type.as_deref()?.trim().to_lowercase();
        Some(match (t.find('('), t.find(')')) {
            (Some(open), Some(close)) if open < close => format!("{}{}", t[..open].trim_end(), &t[close + 1..]),
            _ => t,
        })
    }

    /// Whether `raw` can be cast to the column type. Unknown types accept anything.
    pub fn accepts(&self, raw: &str) -> bool {
        let Some(t) = self.base_type() else { return true };
        let raw = raw.trim();
        match t.as_str() {
            "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" | "smallserial" | "serial2"
            | "serial" | "serial4" | "bigserial" | "serial8" => raw.parse::<i64>().is_ok(),
            "real" | "float4" | "double precision" | "float8" | "numeric" | "decimal" => raw.parse::<f64>().is_ok(),
            "uuid" => uuid::Uuid::parse_str(raw).is_ok(),
            "boolean" | "bool" => matches!(
                raw.to_lowercase().as_str(),
                "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n" | "on" | "off" | "1" | "0"
            ),
            _ => true,
        }
    }
}

/// Row permission with column names already turned into aliases.
#[derive(Clone, Debug)]
pub struct RowPermission {
    pub columns: Vec<String>,
    pub operates: HashSet<AuthOperate>,
    pub compare: CompareMethod,
}

impl RowPermission {
    pub fn protects(&self, op: AuthOperate) -> bool {
        self.operates.contains(&op)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedTable {
    pub model: String,
    pub table_name: String,
    pub database: Option<String>,
    pub columns: Vec<ResolvedColumn>,
    /// Primary key aliases, in key order.
    pub pk: Vec<String>,
    pub row_permission: Option<RowPermission>,
}

impl ResolvedTable {
    pub fn column(&self, alias: &str) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.alias == alias)
    }

    /// Column by alias, skipping hidden columns.
    pub fn visible_column(&self, alias: &str) -> Option<&ResolvedColumn> {
        self.column(alias).filter(|c| !c.hidden)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns.iter().filter(|c| !c.hidden)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub tables: Vec<ResolvedTable>,
    by_name: HashMap<String, usize>,
}

impl ResolvedModel {
    /// Lookup by model name, then by table name.
    pub fn table(&self, name: &str) -> Option<&ResolvedTable> {
        self.by_name
            .get(name)
            .map(|&i| &self.tables[i])
            .or_else(|| self.tables.iter().find(|t| t.table_name == name))
    }
}

fn resolve_table(schema: &TableSchema) -> ResolvedTable {
    let formatter = schema.options.column_formatter;
    let columns: Vec<ResolvedColumn> = schema
        .columns
        .iter()
        .map(|c| ResolvedColumn {
            name: c.name.clone(),
            alias: c.alias.clone().unwrap_or_else(|| formatter.format(&c.name)),
            hidden: c.hide,
            pg_type: c.type_.clone(),
        })
        .collect();
    let alias_of = |name: &str| {
        columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.alias.clone())
            .unwrap_or_else(|| formatter.format(name))
    };
    let pk = schema.pk.iter().map(|c| alias_of(c)).collect();
    let row_permission = schema.options.row_permission.as_ref().map(|rp| RowPermission {
        columns: rp.column.to_vec().iter().map(|c| alias_of(c)).collect(),
        operates: rp.operates.iter().copied().collect(),
        compare: rp.compare,
    });
    ResolvedTable {
        model: schema.model_name().to_string(),
        table_name: schema.table_name.clone(),
        database: schema.options.database.clone(),
        columns,
        pk,
        row_permission,
    }
}

/// Validate and resolve all schemas.
pub fn resolve(schemas: &[TableSchema]) -> Result<ResolvedModel, ConfigError> {
    validate(schemas)?;
    let tables: Vec<ResolvedTable> = schemas.iter().map(resolve_table).collect();
    let by_name = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.model.clone(), i))
        .collect();
    Ok(ResolvedModel { tables, by_name })
}
