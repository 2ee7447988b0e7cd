//! Raw table schema types matching the JSON schema files.

use crate::case::ColumnFormatter;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    pub name: String,
    /// API field name; defaults to the formatted column name.
    #[serde(default)]
    pub alias: Option<String>,
    /// Hidden columns are never selected nor written through the API.
    #[serde(default)]
    pub hide: bool,
    /// PostgreSQL type used to cast bound values (e.g. "int", "timestamptz").
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
}

/// One column name or a list of them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnList {
    Single(String),
    Many(Vec<String>),
}

impl ColumnList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ColumnList::Single(s) => vec![s.clone()],
            ColumnList::Many(v) => v.clone(),
        }
    }
}

/// Operations a row permission can protect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthOperate {
    Read,
    Create,
    Update,
    Delete,
}

/// How a row's permission column is compared with the caller's permission value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMethod {
    #[default]
    Equal,
    /// The column value contains the caller value (e.g. a comma separated owner list).
    Contains,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RowPermissionOptions {
    pub column: ColumnList,
    #[serde(default)]
    pub operates: Vec<AuthOperate>,
    #[serde(default)]
    pub compare: CompareMethod,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    #[serde(default)]
    pub row_permission: Option<RowPermissionOptions>,
    #[serde(default)]
    pub column_formatter: ColumnFormatter,
    /// Target database name; the first configured database when unset.
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub table_name: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub pk: Vec<String>,
    #[serde(default)]
    pub options: TableOptions,
}

impl TableSchema {
    /// Name used in routes and router config: alias, else table name.
    pub fn model_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table_name)
    }
}

/// A schema file holds one table or a list of tables.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum SchemaFile {
    One(TableSchema),
    Many(Vec<TableSchema>),
}

impl SchemaFile {
    pub fn into_vec(self) -> Vec<TableSchema> {
        match self {
            SchemaFile::One(t) => vec![t],
            SchemaFile::Many(v) => v,
        }
    }
}
