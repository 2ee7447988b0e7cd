//! Load table schemas from a JSON file or a directory of JSON files.

use crate::config::types::{SchemaFile, TableSchema};
use crate::error::ConfigError;
use std::path::Path;

/// Load schemas from `path`. A file may contain one schema or an array; a directory is read
/// file by file (`*.json`, sorted by name).
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<TableSchema>, ConfigError> {
    let path = path.as_ref();
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    if !meta.is_dir() {
        return load_file(path).await;
    }

    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ConfigError::Load(e.to_string()))?
    {
        let p = entry.path();
        if p.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(p);
        }
    }
    files.sort();

    let mut out = Vec::new();
    for file in files {
        out.extend(load_file(&file).await?);
    }
    tracing::debug!(path = %path.display(), tables = out.len(), "schemas loaded");
    Ok(out)
}

async fn load_file(path: &Path) -> Result<Vec<TableSchema>, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_schemas(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

pub fn parse_schemas(raw: &str) -> Result<Vec<TableSchema>, serde_json::Error> {
    let file: SchemaFile = serde_json::from_str(raw)?;
    Ok(file.into_vec())
}
