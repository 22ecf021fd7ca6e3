use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, Product, User};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

/// Send one request through a clone of `app`; clones share state.
async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

// --- users ---

#[tokio::test]
async fn list_users_empty() {
    let resp = send(&app(), empty_request("GET", "/users")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<User> = body_json(resp).await;
    assert!(users.is_empty());
}

#[tokio::test]
async fn create_user_returns_201_with_sequential_ids() {
    let app = app();
    let resp = send(
        &app,
        json_request("POST", "/users", r#"{"name":"Ann","email":"ann@example.com"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: User = body_json(resp).await;
    assert_eq!(first.id, 1);

    let resp = send(
        &app,
        json_request("POST", "/users", r#"{"name":"Bob","email":"bob@example.com"}"#),
    )
    .await;
    let second: User = body_json(resp).await;
    assert_eq!(second.id, 2);
}

#[tokio::test]
async fn create_user_malformed_json_returns_422() {
    let resp = send(&app(), json_request("POST", "/users", r#"{"name":"Ann"}"#)).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_user_not_found() {
    let resp = send(&app(), empty_request("GET", "/users/1")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_user_bad_id_returns_400() {
    let resp = send(&app(), empty_request("GET", "/users/not-a-number")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_user_not_found() {
    let resp = send(&app(), json_request("PUT", "/users/1", r#"{"name":"Nope"}"#)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_user_not_found() {
    let resp = send(&app(), empty_request("DELETE", "/users/1")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- products ---

#[tokio::test]
async fn product_crud_lifecycle() {
    let app = app();

    // create
    let resp = send(
        &app,
        json_request(
            "POST",
            "/products",
            r#"{"name":"Laptop","description":"A powerful laptop for developers","price":1500.0,"stock":50}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Product = body_json(resp).await;
    assert_eq!(created.name, "Laptop");
    let id = created.id;

    // get
    let resp = send(&app, empty_request("GET", &format!("/products/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Product = body_json(resp).await;
    assert_eq!(fetched, created);

    // update: price and stock only
    let resp = send(
        &app,
        json_request("PUT", &format!("/products/{id}"), r#"{"price":2000.0,"stock":40}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Product = body_json(resp).await;
    assert_eq!(updated.name, "Laptop");
    assert_eq!(updated.price, 2000.0);
    assert_eq!(updated.stock, 40);

    // list
    let resp = send(&app, empty_request("GET", "/products")).await;
    let products: Vec<Product> = body_json(resp).await;
    assert_eq!(products.len(), 1);

    // delete
    let resp = send(&app, empty_request("DELETE", &format!("/products/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete
    let resp = send(&app, empty_request("GET", &format!("/products/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- fault injection ---

#[tokio::test]
async fn status_route_answers_requested_code() {
    let resp = send(&app(), empty_request("GET", "/status/500")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let resp = send(&app(), empty_request("GET", "/status/404")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_route_rejects_invalid_code() {
    let resp = send(&app(), empty_request("GET", "/status/42")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn flaky_route_recovers_after_failures() {
    let app = app();
    let resp = send(&app, empty_request("GET", "/flaky/2")).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let resp = send(&app, empty_request("GET", "/flaky/2")).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let resp = send(&app, empty_request("GET", "/flaky/2")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["call"], 3);

    let resp = send(&app, empty_request("GET", "/hits")).await;
    let body: Value = body_json(resp).await;
    assert_eq!(body["hits"], 3);
}

#[tokio::test]
async fn echo_reflects_query_and_headers() {
    let request = Request::builder()
        .uri("/echo?page=2&sort=name")
        .header("x-token", "abc")
        .body(String::new())
        .unwrap();
    let resp = send(&app(), request).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["query"]["page"], "2");
    assert_eq!(body["query"]["sort"], "name");
    assert_eq!(body["headers"]["x-token"], "abc");
}

#[tokio::test]
async fn slow_route_eventually_answers() {
    let resp = send(&app(), empty_request("GET", "/slow/10")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["slept_ms"], 10);
}
