//! Entry point: schemas, databases and router config in, `axum::Router` out.

use crate::config::{load_from_path, resolve, DbConfig, ResolvedModel, ResolvedTable, TableSchema};
use crate::dao::{fill_column_types, Dao, PgDao};
use crate::db::DbRegistry;
use crate::error::ConfigError;
use crate::operate::RouterConfig;
use crate::permission::PermissionProvider;
use crate::routes::restful_routes;
use crate::state::{AppState, TableContext};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct RestfulOptions {
    /// Schema file or directory, loaded in addition to `schemas`.
    pub path: Option<PathBuf>,
    pub schemas: Vec<TableSchema>,
    pub db_configs: Vec<DbConfig>,
    pub router_config: RouterConfig,
    pub permission: Option<Arc<dyn PermissionProvider>>,
    pub body_limit: usize,
}

impl Default for RestfulOptions {
    fn default() -> Self {
        RestfulOptions {
            path: None,
            schemas: Vec::new(),
            db_configs: Vec::new(),
            router_config: RouterConfig::default(),
            permission: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

pub struct Restful {
    model: Arc<ResolvedModel>,
    tables: Vec<Arc<TableContext>>,
    databases: DbRegistry,
    router_config: RouterConfig,
    body_limit: usize,
}

impl Restful {
    /// Load schemas, connect the databases and create a `PgDao` per table. Columns without a
    /// declared type take the type the database reports.
    pub async fn new(options: RestfulOptions) -> Result<Self, ConfigError> {
        let mut schemas = options.schemas;
        if let Some(path) = &options.path {
            schemas.extend(load_from_path(path).await?);
        }
        let mut model = resolve(&schemas)?;
        let databases = DbRegistry::connect(&options.db_configs).await?;
        for table in model.tables.iter_mut() {
            if let Some(name) = &table.database {
                if databases.get(name).is_none() {
                    tracing::warn!(table = %table.model, database = %name, "unknown database, using default");
                }
            }
            let pool = databases.pool_for(table.database.as_deref()).ok_or(ConfigError::NoDatabase)?;
            if let Err(e) = fill_column_types(pool, table).await {
                tracing::warn!(table = %table.table_name, error = %e, "column types not loaded");
            }
        }
        let registry = databases.clone();
        let mut restful = Self::build(model, options.permission, move |table| {
            let pool = registry.pool_for(table.database.as_deref()).ok_or(ConfigError::NoDatabase)?;
            Ok(Arc::new(PgDao::new(pool.clone(), table.clone())) as Arc<dyn Dao>)
        })?;
        restful.databases = databases;
        restful.router_config = options.router_config;
        restful.body_limit = options.body_limit;
        Ok(restful)
    }

    /// Build over caller-supplied data access objects, e.g. an in-memory store.
    pub fn with_daos<F>(
        schemas: Vec<TableSchema>,
        router_config: RouterConfig,
        permission: Option<Arc<dyn PermissionProvider>>,
        mut dao_for: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&Arc<ResolvedTable>) -> Arc<dyn Dao>,
    {
        let mut restful = Self::build(resolve(&schemas)?, permission, |t| Ok(dao_for(t)))?;
        restful.router_config = router_config;
        Ok(restful)
    }

    fn build<F>(
        model: ResolvedModel,
        permission: Option<Arc<dyn PermissionProvider>>,
        mut dao_for: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&Arc<ResolvedTable>) -> Result<Arc<dyn Dao>, ConfigError>,
    {
        let mut tables = Vec::with_capacity(model.tables.len());
        for table in &model.tables {
            let protected = table.row_permission.as_ref().map(|r| !r.operates.is_empty()).unwrap_or(false);
            if protected && permission.is_none() {
                return Err(ConfigError::MissingPermissionProvider(table.model.clone()));
            }
            let table = Arc::new(table.clone());
            tables.push(Arc::new(TableContext {
                dao: dao_for(&table)?,
                table,
                permission: permission.clone(),
            }));
        }
        tracing::info!(tables = tables.len(), "restful model resolved");
        Ok(Restful {
            model: Arc::new(model),
            tables,
            databases: DbRegistry::default(),
            router_config: RouterConfig::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        })
    }

    /// Context of a table by model or table name.
    pub fn table(&self, name: &str) -> Option<&Arc<TableContext>> {
        self.tables
            .iter()
            .find(|c| c.table.model == name)
            .or_else(|| self.tables.iter().find(|c| c.table.table_name == name))
    }

    pub fn dao(&self, name: &str) -> Option<Arc<dyn Dao>> {
        self.table(name).map(|c| c.dao.clone())
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn state(&self) -> AppState {
        AppState {
            databases: self.databases.clone(),
            model: self.model.clone(),
        }
    }

    /// Generated routes of every table, with the request body limit applied.
    pub fn router(&self) -> Result<Router, ConfigError> {
        let router = restful_routes(&self.tables, &self.router_config)?;
        Ok(router.layer(RequestBodyLimitLayer::new(self.body_limit)))
    }
}
