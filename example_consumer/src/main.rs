//! Example server: generated routes for the schemas under `SCHEMA_PATH`.
//!
//! Run from repo root: `cargo run -p easycrud-server`
//!
//! Environment: `DATABASE_URL` (plus optional `DATABASE_URL_<NAME>`), `SCHEMA_PATH`
//! (default `example_consumer/schemas`), `BIND_ADDR` (default `127.0.0.1:3000`), `BODY_LIMIT` in bytes,
//! `PERMISSION_HEADER` naming the request header that carries the row permission value
//! (default `x-user-id`).

use easycrud::{common_routes_with_ready, DbConfig, HeaderPermission, PermissionProvider, Restful, RestfulOptions};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("easycrud=info")),
        )
        .init();

    let schema_path = std::env::var("SCHEMA_PATH").unwrap_or_else(|_| "example_consumer/schemas".into());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let mut options = RestfulOptions {
        path: Some(schema_path.into()),
        db_configs: DbConfig::from_env()?,
        ..RestfulOptions::default()
    };
    if let Ok(limit) = std::env::var("BODY_LIMIT") {
        options.body_limit = limit.parse()?;
    }
    let header = std::env::var("PERMISSION_HEADER").unwrap_or_else(|_| "x-user-id".into());
    options.permission = Some(Arc::new(HeaderPermission(header)) as Arc<dyn PermissionProvider>);

    let restful = Restful::new(options).await?;
    let app = common_routes_with_ready(restful.state()).merge(restful.router()?);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("easycrud server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
