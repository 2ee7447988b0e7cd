//! Shared state: database pools for the common routes, and per-table context for the
//! generated handlers.

use crate::config::{ResolvedModel, ResolvedTable};
use crate::dao::Dao;
use crate::db::DbRegistry;
use crate::permission::PermissionProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub databases: DbRegistry,
    pub model: Arc<ResolvedModel>,
}

/// Everything a generated handler of one table needs.
#[derive(Clone)]
pub struct TableContext {
    pub table: Arc<ResolvedTable>,
    pub dao: Arc<dyn Dao>,
    pub permission: Option<Arc<dyn PermissionProvider>>,
}
