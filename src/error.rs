//! Typed errors and HTTP mapping.

use crate::response::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("table config is required")]
    NoTables,
    #[error("primary key of table model {0} is required")]
    MissingPrimaryKey(String),
    #[error("missing reference: table {table} has no column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("table {table}: key column '{column}' must not be hidden")]
    HiddenKeyColumn { table: String, column: String },
    #[error("duplicate table model: {0}")]
    DuplicateModel(String),
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("route {path} conflicts with {existing}")]
    ConflictingRoute { path: String, existing: String },
    #[error("invalid route path: {0}")]
    InvalidRoute(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("table {0} requires row permission check, but no permission provider is defined")]
    MissingPermissionProvider(String),
    #[error("table {0} requires multi-column values to check permissions, but the permission provider returned a string")]
    PermissionShape(String),
    #[error("database name is required")]
    MissingDatabaseName,
    #[error("set at least one database connection config")]
    NoDatabase,
    #[error("database {database}: {source}")]
    Connect {
        database: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("config load: {0}")]
    Load(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("The router handler is not defined.")]
    HandlerNotDefined,
    /// Error with an explicit envelope code, for custom handlers.
    #[error("{message}")]
    Status { code: u16, message: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::HandlerNotDefined => StatusCode::NOT_IMPLEMENTED,
            AppError::Status { code, .. } => StatusCode::from_u16(*code)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Code written into the envelope.
    pub fn code(&self) -> u16 {
        match self {
            AppError::Status { code, .. } if *code != 0 => *code,
            other => other.status().as_u16(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Db(e) = &self {
            tracing::error!(error = %e, "database error");
        }
        let body = Envelope::error(self.code(), self.to_string());
        (body.http_status(), Json(body)).into_response()
    }
}
