//! Schema validation: primary keys, column references, identifiers and model names.

use crate::config::TableSchema;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn sql_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// Aliases and model names end up in URLs and JSON keys; kebab-case is allowed.
fn api_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid regex"))
}

fn check(re: &Regex, s: &str) -> Result<(), ConfigError> {
    if re.is_match(s) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(s.to_string()))
    }
}

pub fn validate(schemas: &[TableSchema]) -> Result<(), ConfigError> {
    if schemas.is_empty() {
        return Err(ConfigError::NoTables);
    }
    let mut models = HashSet::new();
    for t in schemas {
        let model = t.model_name();
        check(sql_identifier(), &t.table_name)?;
        check(api_identifier(), model)?;
        if !models.insert(model) {
            return Err(ConfigError::DuplicateModel(model.to_string()));
        }
        if t.pk.is_empty() {
            return Err(ConfigError::MissingPrimaryKey(model.to_string()));
        }
        for c in &t.columns {
            check(sql_identifier(), &c.name)?;
            if let Some(alias) = &c.alias {
                check(api_identifier(), alias)?;
            }
        }

        let mut key_columns: Vec<String> = t.pk.clone();
        if let Some(rp) = &t.options.row_permission {
            key_columns.extend(rp.column.to_vec());
        }
        for key in &key_columns {
            match t.columns.iter().find(|c| &c.name == key) {
                None => {
                    return Err(ConfigError::MissingColumn {
                        table: t.table_name.clone(),
                        column: key.clone(),
                    })
                }
                Some(c) if c.hide => {
                    return Err(ConfigError::HiddenKeyColumn {
                        table: t.table_name.clone(),
                        column: key.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}
