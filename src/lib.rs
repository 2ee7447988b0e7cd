//! easycrud: RESTful CRUD routes generated from table schemas, on axum and PostgreSQL.
//!
//! Each table schema yields six operates (all, paginate, show, store, edit, destroy) that
//! can be overridden, extended or replaced per table through a [`RouterConfig`].

pub mod case;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod handlers;
pub mod operate;
pub mod permission;
pub mod query;
pub mod response;
pub mod restful;
pub mod routes;
pub mod sql;
pub mod state;

pub use case::ColumnFormatter;
pub use config::{load_from_path, resolve, DbConfig, ResolvedModel, ResolvedTable, TableSchema};
pub use dao::{Dao, Page, PgDao, Record};
pub use db::DbRegistry;
pub use error::{AppError, ConfigError};
pub use operate::{
    Middleware, OperateConfig, OperateHandler, OperateMethod, ResourceOperate, RestfulRequest,
    RouterConfig, TableRouterConfig,
};
pub use permission::{HeaderPermission, PermissionProvider, PermissionValue, RequestMeta};
pub use query::{Condition, Operator, PageParams, Pagination};
pub use response::Envelope;
pub use restful::{Restful, RestfulOptions};
pub use routes::{common_routes, common_routes_with_ready, restful_routes};
pub use state::{AppState, TableContext};
