//! Database connection settings, from code or environment.

use crate::error::ConfigError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Name tables refer to through their `database` option.
    pub database: String,
    pub url: String,
    pub max_connections: u32,
}

impl DbConfig {
    /// Config for `url`, named after the database in its path (postgres://host/<name>).
    pub fn from_url(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let database = database_name_from_url(&url).ok_or(ConfigError::MissingDatabaseName)?;
        Ok(DbConfig {
            database,
            url,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        })
    }

    pub fn named(database: impl Into<String>, url: impl Into<String>) -> Self {
        DbConfig {
            database: database.into(),
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn with_max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Read `DATABASE_URL` (optionally named by `DATABASE_NAME`) plus one extra database per
    /// `DATABASE_URL_<NAME>` variable. `DATABASE_MAX_CONNECTIONS` applies to all of them.
    pub fn from_env() -> Result<Vec<Self>, ConfigError> {
        let max = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let mut out = Vec::new();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            let cfg = match std::env::var("DATABASE_NAME") {
                Ok(name) if !name.is_empty() => DbConfig::named(name, url),
                _ => DbConfig::from_url(url)?,
            };
            out.push(cfg.with_max_connections(max));
        }
        let mut extra: Vec<(String, String)> = std::env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix("DATABASE_URL_")
                    .filter(|name| !name.is_empty())
                    .map(|name| (name.to_lowercase(), v))
            })
            .collect();
        extra.sort();
        for (name, url) in extra {
            out.push(DbConfig::named(name, url).with_max_connections(max));
        }
        if out.is_empty() {
            return Err(ConfigError::NoDatabase);
        }
        Ok(out)
    }
}

/// Last path segment of a connection URL, without query string.
pub fn database_name_from_url(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let (_, path) = rest.split_once('/')?;
    let name = path.split(['?', '#']).next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
