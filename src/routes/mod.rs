//! Routers: generated table routes and the common health routes.

pub mod common;
pub mod restful;

pub use common::{common_routes, common_routes_with_ready};
pub use restful::{default_path, resolve_routes, restful_routes, Route};
