//! Generated routes of all tables, built from default operates and the router config.

use crate::dao::Dao;
use crate::error::{AppError, ConfigError};
use crate::handlers::restful::default_operates;
use crate::operate::{
    merge_operates, Middleware, OperateConfig, OperateHandler, OperateMethod, ResourceOperate,
    RestfulRequest, RouterConfig,
};
use crate::config::ResolvedTable;
use crate::response::Envelope;
use crate::state::TableContext;
use axum::{
    extract::{Request, State},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{on, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// One operate ready to be mounted.
#[derive(Clone)]
pub struct Route {
    pub name: String,
    pub method: OperateMethod,
    pub path: String,
    pub middleware: Vec<Middleware>,
    pub handler: Option<OperateHandler>,
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Path of an operate when the config sets none.
pub fn default_path(table: &ResolvedTable, operate: &str) -> String {
    match ResourceOperate::from_name(operate) {
        Some(ResourceOperate::All) => format!("/all_{}", table.model),
        Some(op) if op.by_primary_key() => {
            let keys: Vec<String> = table.pk.iter().map(|k| format!(":{}", k)).collect();
            format!("/{}/{}", table.model, keys.join("/"))
        }
        _ => format!("/{}", table.model),
    }
}

/// Fill in methods and paths of merged operates.
pub fn resolve_routes(table: &ResolvedTable, operates: Vec<(String, OperateConfig)>) -> Vec<Route> {
    operates
        .into_iter()
        .map(|(name, cfg)| {
            let path = cfg
                .path
                .as_deref()
                .map(normalize_path)
                .unwrap_or_else(|| default_path(table, &name));
            Route {
                method: cfg.method.unwrap_or_default(),
                path,
                middleware: cfg.middleware,
                handler: cfg.handler,
                name,
            }
        })
        .collect()
}

struct Endpoint {
    dao: Arc<dyn Dao>,
    handler: Option<OperateHandler>,
}

async fn dispatch(State(endpoint): State<Arc<Endpoint>>, req: Request) -> Response {
    let Some(handler) = endpoint.handler.clone() else {
        return AppError::HandlerNotDefined.into_response();
    };
    let result = match RestfulRequest::from_request(endpoint.dao.clone(), req).await {
        Ok(req) => handler.call(req).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(data) => Envelope::success(data).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn run_middleware(State(mw): State<Middleware>, req: Request, next: Next) -> Response {
    mw.call(req, next).await
}

fn method_router(route: &Route, dao: Arc<dyn Dao>) -> MethodRouter {
    let endpoint = Arc::new(Endpoint {
        dao,
        handler: route.handler.clone(),
    });
    let mut router = on(route.method.filter(), dispatch).with_state(endpoint);
    // The first middleware must run first, so it is layered last.
    for mw in route.middleware.iter().rev() {
        router = router.layer(from_fn_with_state(mw.clone(), run_middleware));
    }
    router
}

fn dynamic(segment: &str) -> bool {
    segment.starts_with(':') || segment.starts_with('*')
}

/// Reject paths the router cannot hold: unnamed params, params inside a segment, a catch-all
/// that is not last.
fn check_path(path: &str) -> Result<(), ConfigError> {
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    for (i, seg) in segments.iter().enumerate() {
        let (name, rest) = if dynamic(seg) { (&seg[1..], seg.starts_with('*')) } else { (*seg, false) };
        let named = !dynamic(seg) || !name.is_empty();
        if !named || name.contains([':', '*']) || (rest && i + 1 != segments.len()) {
            return Err(ConfigError::InvalidRoute(path.to_string()));
        }
    }
    Ok(())
}

/// Two paths conflict when, after the same leading segments, they put differently named
/// params at one position.
fn conflicts(a: &str, b: &str) -> bool {
    for (x, y) in a.split('/').zip(b.split('/')) {
        match (dynamic(x), dynamic(y)) {
            (true, true) if x != y => return true,
            (true, true) => continue,
            (false, false) if x == y => continue,
            _ => return false,
        }
    }
    false
}

/// Router with the operates of every table. Fails on a path/method pair registered twice and on
/// paths whose params clash.
pub fn restful_routes(tables: &[Arc<TableContext>], config: &RouterConfig) -> Result<Router, ConfigError> {
    let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
    let mut seen: HashSet<(String, OperateMethod)> = HashSet::new();
    for ctx in tables {
        let custom = config.for_table(&ctx.table.model, &ctx.table.table_name);
        let operates = merge_operates(default_operates(ctx), custom);
        for route in resolve_routes(&ctx.table, operates) {
            check_path(&route.path)?;
            if let Some(existing) = by_path.keys().find(|p| conflicts(p, &route.path)) {
                return Err(ConfigError::ConflictingRoute {
                    path: route.path,
                    existing: existing.clone(),
                });
            }
            if !seen.insert((route.path.clone(), route.method)) {
                return Err(ConfigError::DuplicateRoute {
                    method: route.method.as_str().to_string(),
                    path: route.path,
                });
            }
            tracing::debug!(
                table = %ctx.table.model,
                operate = %route.name,
                method = route.method.as_str(),
                path = %route.path,
                "route registered"
            );
            let mr = method_router(&route, ctx.dao.clone());
            let merged = match by_path.remove(&route.path) {
                Some(existing) => existing.merge(mr),
                None => mr,
            };
            by_path.insert(route.path, merged);
        }
    }
    Ok(by_path
        .into_iter()
        .fold(Router::new(), |router, (path, mr)| router.route(&path, mr)))
}
