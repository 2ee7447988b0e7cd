//! Database pools by name. The first configured database is the default.

use crate::config::DbConfig;
use crate::error::ConfigError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Clone, Default)]
pub struct DbRegistry {
    pools: Vec<(String, PgPool)>,
}

impl DbRegistry {
    /// Connect every config once per database name, in order.
    pub async fn connect(configs: &[DbConfig]) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::NoDatabase);
        }
        let mut registry = DbRegistry::default();
        for cfg in configs {
            if cfg.database.is_empty() {
                return Err(ConfigError::MissingDatabaseName);
            }
            if registry.get(&cfg.database).is_some() {
                continue;
            }
            let pool = PgPoolOptions::new()
                .max_connections(cfg.max_connections)
                .connect(&cfg.url)
                .await
                .map_err(|source| ConfigError::Connect {
                    database: cfg.database.clone(),
                    source,
                })?;
            tracing::info!(database = %cfg.database, "database connected");
            registry.pools.push((cfg.database.clone(), pool));
        }
        Ok(registry)
    }

    /// Register an existing pool (e.g. one shared with the host application).
    pub fn with_pool(mut self, database: impl Into<String>, pool: PgPool) -> Self {
        let database = database.into();
        if self.get(&database).is_none() {
            self.pools.push((database, pool));
        }
        self
    }

    pub fn get(&self, database: &str) -> Option<&PgPool> {
        self.pools.iter().find(|(n, _)| n == database).map(|(_, p)| p)
    }

    /// Pool for a table's `database` option; unknown or unset names use the default pool.
    pub fn pool_for(&self, database: Option<&str>) -> Option<&PgPool> {
        database
            .and_then(|d| self.get(d))
            .or_else(|| self.pools.first().map(|(_, p)| p))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PgPool)> {
        self.pools.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
