//! Generated handlers of a table: all, paginate, show, store, edit, destroy.

use crate::config::AuthOperate;
use crate::dao::{Dao, Record};
use crate::error::AppError;
use crate::operate::{OperateConfig, OperateHandler, OperateMethod, ResourceOperate, RestfulRequest};
use crate::permission::{PermissionGuard, PermissionValue, RequestMeta};
use crate::query::{parse_conditions, Condition, PageParams};
use crate::state::TableContext;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

async fn guard<'a>(ctx: &'a TableContext, meta: &RequestMeta) -> Result<PermissionGuard<'a>, AppError> {
    let value = match (&ctx.table.row_permission, &ctx.permission) {
        (Some(_), Some(provider)) => provider.permission(meta).await?,
        _ => PermissionValue::default(),
    };
    Ok(PermissionGuard::new(&ctx.table.model, ctx.table.row_permission.as_ref(), value))
}

/// One equality per primary key alias, read from the path params. A value the key column
/// cannot hold names no row.
pub fn pk_conditions(ctx: &TableContext, params: &HashMap<String, String>) -> Result<Vec<Condition>, AppError> {
    ctx.table
        .pk
        .iter()
        .map(|key| {
            let v = params
                .get(key)
                .ok_or_else(|| AppError::BadRequest(format!("missing path param '{}'", key)))?;
            if ctx.table.column(key).map(|c| !c.accepts(v)).unwrap_or(false) {
                return Err(AppError::NotFound(format!("{} not found", ctx.table.model)));
            }
            Ok(Condition::eq(key.clone(), Value::String(v.clone())))
        })
        .collect()
}

/// Accepts the record itself or `{ "data": { ... } }`.
fn body_to_record(body: Value) -> Result<Record, AppError> {
    match body {
        Value::Object(mut m) => {
            if m.len() == 1 && matches!(m.get("data"), Some(Value::Object(_))) {
                if let Some(Value::Object(inner)) = m.remove("data") {
                    return Ok(inner);
                }
            }
            Ok(m)
        }
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// A row the caller could not reach: 403 when it exists outside their permission, else 404.
async fn denied_or_missing(
    ctx: &TableContext,
    dao: &dyn Dao,
    pk: &[Condition],
    permission: &[Condition],
) -> AppError {
    let missing = AppError::NotFound(format!("{} not found", ctx.table.model));
    if permission.is_empty() {
        return missing;
    }
    match dao.get_by_pk(pk, &[]).await {
        Ok(Some(_)) => AppError::Forbidden(format!("no permission on this {} row", ctx.table.model)),
        Ok(None) => missing,
        Err(e) => e,
    }
}

fn rows_value(rows: Vec<Record>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

pub async fn all(ctx: &TableContext, req: RestfulRequest) -> Result<Value, AppError> {
    let guard = guard(ctx, &req.meta).await?;
    let mut filter = parse_conditions(&ctx.table, &req.query)?;
    filter.extend(guard.conditions(AuthOperate::Read)?);
    let mut rows = req.dao.all(&filter).await?;
    guard.append(&mut rows)?;
    Ok(rows_value(rows))
}

pub async fn paginate(ctx: &TableContext, req: RestfulRequest) -> Result<Value, AppError> {
    let guard = guard(ctx, &req.meta).await?;
    let params = PageParams::from_query(&ctx.table, &req.query)?;
    let mut filter = parse_conditions(&ctx.table, &req.query)?;
    filter.extend(guard.conditions(AuthOperate::Read)?);
    let mut page = req.dao.paginate(&filter, &params).await?;
    guard.append(&mut page.data)?;
    Ok(serde_json::to_value(page)?)
}

pub async fn show(ctx: &TableContext, req: RestfulRequest) -> Result<Value, AppError> {
    let guard = guard(ctx, &req.meta).await?;
    let pk = pk_conditions(ctx, &req.params)?;
    let permission = guard.conditions(AuthOperate::Read)?;
    match req.dao.get_by_pk(&pk, &permission).await? {
        Some(row) => Ok(Value::Object(row)),
        None => Err(denied_or_missing(ctx, req.dao.as_ref(), &pk, &permission).await),
    }
}

pub async fn store(ctx: &TableContext, req: RestfulRequest) -> Result<Value, AppError> {
    let guard = guard(ctx, &req.meta).await?;
    let mut record = body_to_record(req.body)?;
    guard.prepare_create(&mut record)?;
    let row = req.dao.create(&record).await?;
    tracing::info!(table = %ctx.table.model, "row created");
    Ok(Value::Object(row))
}

pub async fn edit(ctx: &TableContext, req: RestfulRequest) -> Result<Value, AppError> {
    let guard = guard(ctx, &req.meta).await?;
    let pk = pk_conditions(ctx, &req.params)?;
    let permission = guard.conditions(AuthOperate::Update)?;
    let record = body_to_record(req.body)?;
    if record.is_empty() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }
    match req.dao.update_by_pk(&pk, &permission, &record).await? {
        Some(row) => Ok(Value::Object(row)),
        None => Err(denied_or_missing(ctx, req.dao.as_ref(), &pk, &permission).await),
    }
}

pub async fn destroy(ctx: &TableContext, req: RestfulRequest) -> Result<Value, AppError> {
    let guard = guard(ctx, &req.meta).await?;
    let pk = pk_conditions(ctx, &req.params)?;
    let permission = guard.conditions(AuthOperate::Delete)?;
    let deleted = req.dao.delete_by_pk(&pk, &permission).await?;
    if deleted == 0 {
        return Err(denied_or_missing(ctx, req.dao.as_ref(), &pk, &permission).await);
    }
    tracing::info!(table = %ctx.table.model, deleted, "rows deleted");
    Ok(Value::from(deleted))
}

fn bind<F, Fut>(ctx: &Arc<TableContext>, f: F) -> OperateHandler
where
    F: Fn(Arc<TableContext>, RestfulRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
{
    let ctx = ctx.clone();
    OperateHandler::new(move |req| f(ctx.clone(), req))
}

/// Generated operates of a table with method and handler. Paths are left unset except for
/// `all`, whose path cannot be told apart from `paginate` by method alone.
pub fn default_operates(ctx: &Arc<TableContext>) -> Vec<(String, OperateConfig)> {
    ResourceOperate::ALL
        .into_iter()
        .map(|op| {
            let handler = match op {
                ResourceOperate::All => bind(ctx, |c, r| async move { all(&c, r).await }),
                ResourceOperate::Paginate => bind(ctx, |c, r| async move { paginate(&c, r).await }),
                ResourceOperate::Show => bind(ctx, |c, r| async move { show(&c, r).await }),
                ResourceOperate::Store => bind(ctx, |c, r| async move { store(&c, r).await }),
                ResourceOperate::Edit => bind(ctx, |c, r| async move { edit(&c, r).await }),
                ResourceOperate::Destroy => bind(ctx, |c, r| async move { destroy(&c, r).await }),
            };
            let method = match op {
                ResourceOperate::All | ResourceOperate::Paginate | ResourceOperate::Show => OperateMethod::Get,
                ResourceOperate::Store => OperateMethod::Post,
                ResourceOperate::Edit => OperateMethod::Put,
                ResourceOperate::Destroy => OperateMethod::Delete,
            };
            let mut config = OperateConfig::new().method(method).handler(handler);
            if op == ResourceOperate::All {
                config = config.path(format!("all_{}", ctx.table.model));
            }
            (op.as_str().to_string(), config)
        })
        .collect()
}
