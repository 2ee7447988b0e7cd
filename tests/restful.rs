mod common;

use axum::{
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use common::{call, fixtures, schemas, MockDao};
use easycrud::{
    AppError, ConfigError, Dao, HeaderPermission, Middleware, OperateConfig, OperateHandler,
    OperateMethod, PermissionProvider, Restful, RouterConfig, TableRouterConfig,
};
use serde_json::json;
use std::sync::Arc;

fn restful(config: RouterConfig) -> Restful {
    let permission: Arc<dyn PermissionProvider> = Arc::new(HeaderPermission("x-user-id".into()));
    Restful::with_daos(schemas(), config, Some(permission), |table| {
        Arc::new(MockDao::new(table.clone(), fixtures(&table.model))) as Arc<dyn Dao>
    })
    .unwrap()
}

fn app(config: RouterConfig) -> Router {
    restful(config).router().unwrap()
}

#[tokio::test]
async fn lists_all_rows() {
    let (status, body) = call(&app(RouterConfig::new()), "GET", "/all_users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["msg"], "success");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn filters_by_query() {
    let app = app(RouterConfig::new());
    let (_, body) = call(&app, "GET", "/all_users?name=bob", None, None).await;
    assert_eq!(body["data"], json!([{"id": 2, "name": "bob", "orgId": 20}]));

    let (_, body) = call(&app, "GET", "/all_users?orgId:gt=15", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "GET", "/all_users?name:near=x", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["data"], json!(null));
}

#[tokio::test]
async fn query_operators() {
    let app = app(RouterConfig::new());
    let (_, body) = call(&app, "GET", "/all_users?id:in=1,3", None, None).await;
    assert_eq!(body["data"], json!([{"id": 1, "name": "alice", "orgId": 10}]));

    let (_, body) = call(&app, "GET", "/all_users?orgId:between=15,25", None, None).await;
    assert_eq!(body["data"], json!([{"id": 2, "name": "bob", "orgId": 20}]));

    let (_, body) = call(&app, "GET", "/all_users?name:like=lic", None, None).await;
    assert_eq!(body["data"][0]["name"], "alice");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "GET", "/all_users?id=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn orders_descending() {
    let (status, body) = call(&app(RouterConfig::new()), "GET", "/users?orderBy=name,desc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert_eq!(names, vec!["bob", "alice"]);
}

#[tokio::test]
async fn paginates() {
    let (status, body) = call(
        &app(RouterConfig::new()),
        "GET",
        "/users?page=2&pageSize=1&orderBy=id,asc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"], json!([{"id": 2, "name": "bob", "orgId": 20}]));
    let p = &body["data"]["pagination"];
    assert_eq!(p["total"], 2);
    assert_eq!(p["currentPage"], 2);
    assert_eq!(p["lastPage"], 2);
    assert_eq!(p["perPage"], 1);
}

#[tokio::test]
async fn shows_one_row() {
    let app = app(RouterConfig::new());
    let (status, body) = call(&app, "GET", "/users/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "alice");

    let (status, body) = call(&app, "GET", "/users/9", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn key_of_wrong_type_is_not_found() {
    let app = app(RouterConfig::new());
    let (status, body) = call(&app, "GET", "/users/abc", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = call(&app, "DELETE", "/users/1.5", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stores_edits_and_destroys() {
    let restful = restful(RouterConfig::new());
    let app = restful.router().unwrap();

    let (status, body) = call(&app, "POST", "/users", Some(json!({"data": {"name": "carol"}})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"name": "carol", "id": 3}));

    let (status, body) = call(&app, "PUT", "/users/1", Some(json!({"name": "alice2"})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "alice2");

    let (status, body) = call(&app, "DELETE", "/users/2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 1);

    let (status, _) = call(&app, "DELETE", "/users/2", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let rows = restful.dao("users").unwrap().all(&[]).await.unwrap();
    let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("alice2"), json!("carol")]);
}

#[tokio::test]
async fn rejects_non_object_body() {
    let app = app(RouterConfig::new());
    let (status, _) = call(&app, "POST", "/users", Some(json!([1, 2])), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/users", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = call(&app, "PUT", "/users/1", Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn custom_route() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate(
            "custom",
            OperateConfig::new()
                .path("custom")
                .handler(OperateHandler::new(|_req| async { Ok(json!("custom test")) })),
        ),
    );
    let app = app(config);
    let (status, body) = call(&app, "GET", "/custom", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "custom test");

    let (status, _) = call(&app, "GET", "/users/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn custom_handler_uses_table_dao() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate(
            "count",
            OperateConfig::new()
                .path("/users_count")
                .handler(OperateHandler::new(|req| async move {
                    let rows = req.dao.all(&[]).await?;
                    Ok::<_, AppError>(json!(rows.len()))
                })),
        ),
    );
    let (_, body) = call(&app(config), "GET", "/users_count", None, None).await;
    assert_eq!(body["data"], 2);
}

#[tokio::test]
async fn overwrite_replaces_generated_routes() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().overwrite(true).operate(
            "custom",
            OperateConfig::new()
                .path("/custom")
                .method(OperateMethod::Post)
                .handler(OperateHandler::new(|req| async move { Ok(req.body) })),
        ),
    );
    let app = app(config);
    let (status, _) = call(&app, "GET", "/users", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = call(&app, "POST", "/custom", Some(json!({"a": 1})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"a": 1}));
    // Other tables keep their routes.
    let (status, _) = call(&app, "GET", "/posts/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn merged_operate_keeps_generated_handler() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate("show", OperateConfig::new().path("/people/:id")),
    );
    let app = app(config);
    let (status, body) = call(&app, "GET", "/people/2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "bob");
}

async fn require_token(req: axum::extract::Request, next: Next) -> Response {
    if req.headers().contains_key("x-token") {
        next.run(req).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

#[tokio::test]
async fn operate_middleware() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate("paginate", OperateConfig::new().middleware(Middleware::new(require_token))),
    );
    let app = app(config);
    let (status, _) = call(&app, "GET", "/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = axum::http::Request::builder()
        .uri("/users")
        .header("x-token", "t")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = tower::ServiceExt::oneshot(app.clone(), req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Middleware only wraps its own operate.
    let (status, _) = call(&app, "GET", "/all_users", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_handler() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate("nothing", OperateConfig::new().path("/nothing")),
    );
    let (status, body) = call(&app(config), "GET", "/nothing", None, None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["code"], 501);
    assert_eq!(body["msg"], "The router handler is not defined.");
}

#[tokio::test]
async fn custom_error_codes() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new()
            .operate(
                "teapot",
                OperateConfig::new().path("/teapot").handler(OperateHandler::new(|_req| async {
                    Err(AppError::Status { code: 418, message: "short and stout".into() })
                })),
            )
            .operate(
                "app_code",
                OperateConfig::new().path("/app_code").handler(OperateHandler::new(|_req| async {
                    Err(AppError::Status { code: 1001, message: "quota".into() })
                })),
            ),
    );
    let app = app(config);
    let (status, body) = call(&app, "GET", "/teapot", None, None).await;
    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body, json!({"code": 418, "msg": "short and stout", "data": null}));

    let (status, body) = call(&app, "GET", "/app_code", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn duplicate_route_is_config_error() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate("list_again", OperateConfig::new().path("/users")),
    );
    let err = restful(config).router().unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateRoute { ref path, .. } if path == "/users"));
}

#[tokio::test]
async fn clashing_param_names_are_config_error() {
    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate(
            "rename",
            OperateConfig::new().path("/users/:name").method(OperateMethod::Patch),
        ),
    );
    let err = restful(config).router().unwrap_err();
    assert!(matches!(err, ConfigError::ConflictingRoute { ref path, .. } if path == "/users/:name"));

    let config = RouterConfig::new().table(
        "users",
        TableRouterConfig::new().operate("bad", OperateConfig::new().path("/users/*rest/tail")),
    );
    assert!(matches!(restful(config).router().unwrap_err(), ConfigError::InvalidRoute(_)));
}

#[tokio::test]
async fn row_permission_requires_provider() {
    let err = Restful::with_daos(schemas(), RouterConfig::new(), None, |table| {
        Arc::new(MockDao::new(table.clone(), Vec::new())) as Arc<dyn Dao>
    })
    .err()
    .unwrap();
    assert!(matches!(err, ConfigError::MissingPermissionProvider(ref t) if t == "posts"));
}

#[tokio::test]
async fn list_rows_carry_forbid_flags() {
    let (_, body) = call(&app(RouterConfig::new()), "GET", "/all_posts", None, Some("u1")).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows[0]["forbid"], json!({"update": false, "delete": false}));
    assert_eq!(rows[1]["forbid"], json!({"update": true, "delete": true}));

    let (_, body) = call(&app(RouterConfig::new()), "GET", "/all_users", None, Some("u1")).await;
    assert!(body["data"][0].get("forbid").is_none());
}

#[tokio::test]
async fn row_permission_on_edit_and_destroy() {
    let app = app(RouterConfig::new());
    let (status, body) = call(&app, "PUT", "/posts/2", Some(json!({"title": "hijack"})), Some("u1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);

    let (status, _) = call(&app, "PUT", "/posts/9", Some(json!({"title": "x"})), Some("u1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "DELETE", "/posts/2", None, Some("u1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "PUT", "/posts/1", Some(json!({"title": "edited"})), Some("u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "edited");

    let (status, body) = call(&app, "DELETE", "/posts/2", None, Some("u2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 1);

    // Read is not protected.
    let (status, _) = call(&app, "GET", "/posts/1", None, Some("u2")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn row_permission_on_store() {
    let app = app(RouterConfig::new());
    let (status, body) = call(&app, "POST", "/posts", Some(json!({"title": "new"})), Some("u3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ownerId"], "u3");

    let (status, _) = call(&app, "POST", "/posts", Some(json!({"title": "x", "ownerId": "u1"})), Some("u3")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
