//! Operates: one route of a table (method, path, middleware, handler), and the per-table
//! router config that overrides or extends the generated ones.

use crate::dao::Dao;
use crate::error::AppError;
use crate::permission::RequestMeta;
use axum::{
    body::Body,
    extract::{FromRequestParts, Path, Query, Request},
    middleware::Next,
    response::Response,
    routing::MethodFilter,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// The generated operates of every table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceOperate {
    All,
    Paginate,
    Show,
    Store,
    Edit,
    Destroy,
}

impl ResourceOperate {
    pub const ALL: [ResourceOperate; 6] = [
        ResourceOperate::All,
        ResourceOperate::Paginate,
        ResourceOperate::Show,
        ResourceOperate::Store,
        ResourceOperate::Edit,
        ResourceOperate::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceOperate::All => "all",
            ResourceOperate::Paginate => "paginate",
            ResourceOperate::Show => "show",
            ResourceOperate::Store => "store",
            ResourceOperate::Edit => "edit",
            ResourceOperate::Destroy => "destroy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == name)
    }

    /// Operates addressing one row, whose default path ends with the primary key params.
    pub fn by_primary_key(&self) -> bool {
        matches!(self, ResourceOperate::Show | ResourceOperate::Edit | ResourceOperate::Destroy)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperateMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl OperateMethod {
    pub fn filter(&self) -> MethodFilter {
        match self {
            OperateMethod::Get => MethodFilter::GET,
            OperateMethod::Post => MethodFilter::POST,
            OperateMethod::Put => MethodFilter::PUT,
            OperateMethod::Delete => MethodFilter::DELETE,
            OperateMethod::Patch => MethodFilter::PATCH,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperateMethod::Get => "GET",
            OperateMethod::Post => "POST",
            OperateMethod::Put => "PUT",
            OperateMethod::Delete => "DELETE",
            OperateMethod::Patch => "PATCH",
        }
    }
}

/// What a handler receives: the table's data access object and the parsed request.
pub struct RestfulRequest {
    pub dao: Arc<dyn Dao>,
    /// Path params by name (primary key aliases for the generated row routes).
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// JSON body; `Null` when the request has none.
    pub body: Value,
    pub meta: RequestMeta,
}

impl RestfulRequest {
    pub async fn from_request(dao: Arc<dyn Dao>, req: Request) -> Result<Self, AppError> {
        let (mut parts, body) = req.into_parts();
        let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
            Ok(Path(p)) => p,
            Err(_) => HashMap::new(),
        };
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let body = read_json(body).await?;
        Ok(RestfulRequest {
            dao,
            params,
            query,
            body,
            meta: RequestMeta {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                extensions: parts.extensions,
            },
        })
    }
}

async fn read_json(body: Body) -> Result<Value, AppError> {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::BadRequest(format!("body: {}", e)))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

/// Handler of one operate. The value it returns becomes the envelope's `data`.
#[derive(Clone)]
pub struct OperateHandler(Arc<dyn Fn(RestfulRequest) -> BoxFuture<Result<Value, AppError>> + Send + Sync>);

impl OperateHandler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(RestfulRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        OperateHandler(Arc::new(move |req| Box::pin(f(req))))
    }

    pub async fn call(&self, req: RestfulRequest) -> Result<Value, AppError> {
        (self.0)(req).await
    }
}

/// Middleware wrapping a single operate, in the shape of `axum::middleware::from_fn`.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Request, Next) -> BoxFuture<Response> + Send + Sync>);

impl Middleware {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Middleware(Arc::new(move |req, next| Box::pin(f(req, next))))
    }

    pub async fn call(&self, req: Request, next: Next) -> Response {
        (self.0)(req, next).await
    }
}

/// Partial operate: unset fields keep the generated value when merged.
#[derive(Clone, Default)]
pub struct OperateConfig {
    pub method: Option<OperateMethod>,
    pub path: Option<String>,
    pub middleware: Vec<Middleware>,
    pub handler: Option<OperateHandler>,
}

impl OperateConfig {
    pub fn new() -> Self {
        OperateConfig::default()
    }

    pub fn method(mut self, method: OperateMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middleware.push(mw);
        self
    }

    pub fn handler(mut self, handler: OperateHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Fields set in `other` win; middleware lists are concatenated.
    pub fn merge(mut self, other: OperateConfig) -> Self {
        if other.method.is_some() {
            self.method = other.method;
        }
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.handler.is_some() {
            self.handler = other.handler;
        }
        self.middleware.extend(other.middleware);
        self
    }
}

/// Router config of one table.
#[derive(Clone, Default)]
pub struct TableRouterConfig {
    /// Replace the generated operates instead of merging into them.
    pub overwrite: bool,
    pub operates: Vec<(String, OperateConfig)>,
}

impl TableRouterConfig {
    pub fn new() -> Self {
        TableRouterConfig::default()
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn operate(mut self, name: impl Into<String>, config: OperateConfig) -> Self {
        self.operates.push((name.into(), config));
        self
    }
}

/// Router config of all tables, keyed by model name or table name.
#[derive(Clone, Default)]
pub struct RouterConfig {
    tables: HashMap<String, TableRouterConfig>,
}

impl RouterConfig {
    pub fn new() -> Self {
        RouterConfig::default()
    }

    pub fn table(mut self, name: impl Into<String>, config: TableRouterConfig) -> Self {
        self.tables.insert(name.into(), config);
        self
    }

    /// Config registered under the model name, else under the table name.
    pub fn for_table(&self, model: &str, table_name: &str) -> Option<&TableRouterConfig> {
        self.tables.get(model).or_else(|| self.tables.get(table_name))
    }
}

/// Merge a table's router config into its generated operates, keeping generated order first.
pub fn merge_operates(
    defaults: Vec<(String, OperateConfig)>,
    custom: Option<&TableRouterConfig>,
) -> Vec<(String, OperateConfig)> {
    let Some(custom) = custom else {
        return defaults;
    };
    if custom.overwrite {
        return custom.operates.clone();
    }
    let mut out = defaults;
    for (name, cfg) in &custom.operates {
        match out.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => {
                let merged = std::mem::take(existing).merge(cfg.clone());
                *existing = merged;
            }
            None => out.push((name.clone(), cfg.clone())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handler(v: &'static str) -> OperateHandler {
        OperateHandler::new(move |_req| async move { Ok(json!(v)) })
    }

    fn defaults() -> Vec<(String, OperateConfig)> {
        vec![
            ("paginate".into(), OperateConfig::new().method(OperateMethod::Get).handler(handler("list"))),
            ("store".into(), OperateConfig::new().method(OperateMethod::Post).handler(handler("store"))),
        ]
    }

    #[test]
    fn operate_names_round_trip() {
        for op in ResourceOperate::ALL {
            assert_eq!(ResourceOperate::from_name(op.as_str()), Some(op));
        }
        assert!(ResourceOperate::Show.by_primary_key());
        assert!(!ResourceOperate::Store.by_primary_key());
    }

    #[test]
    fn merge_overrides_set_fields_only() {
        let custom = TableRouterConfig::new()
            .operate("store", OperateConfig::new().path("/signup"))
            .operate("custom", OperateConfig::new().path("/custom").handler(handler("custom")));
        let merged = merge_operates(defaults(), Some(&custom));
        let names: Vec<_> = merged.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["paginate", "store", "custom"]);
        let store = &merged[1].1;
        assert_eq!(store.path.as_deref(), Some("/signup"));
        assert_eq!(store.method, Some(OperateMethod::Post));
        assert!(store.handler.is_some());
    }

    #[test]
    fn overwrite_replaces_defaults() {
        let custom = TableRouterConfig::new()
            .overwrite(true)
            .operate("custom", OperateConfig::new().path("/custom"));
        let merged = merge_operates(defaults(), Some(&custom));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].0, "custom");
    }

    #[test]
    fn middleware_lists_concatenate() {
        let mw = Middleware::new(|req, next: Next| async move { next.run(req).await });
        let a = OperateConfig::new().middleware(mw.clone());
        let b = OperateConfig::new().middleware(mw.clone()).middleware(mw);
        assert_eq!(a.merge(b).middleware.len(), 3);
    }

    #[test]
    fn router_config_lookup_by_model_then_table() {
        let rc = RouterConfig::new().table("user_accounts", TableRouterConfig::new().overwrite(true));
        assert!(rc.for_table("users", "user_accounts").unwrap().overwrite);
        assert!(rc.for_table("posts", "posts").is_none());
    }
}
