use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u32>,
}

/// In-memory rows of one resource, with sequential ids starting at 1.
pub struct Collection<T> {
    next_id: u64,
    rows: BTreeMap<u64, T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

/// A CRUD resource served under its own path.
pub trait Resource: Clone + Serialize + Send + Sync + 'static {
    type Create: for<'de> Deserialize<'de> + Send + 'static;
    type Update: for<'de> Deserialize<'de> + Send + 'static;

    fn create(id: u64, input: Self::Create) -> Self;
    fn apply(&mut self, update: Self::Update);
    fn collection(state: &AppState) -> &RwLock<Collection<Self>>;
}

impl Resource for User {
    type Create = CreateUser;
    type Update = UpdateUser;

    fn create(id: u64, input: CreateUser) -> Self {
        User {
            id,
            name: input.name,
            email: input.email,
        }
    }

    fn apply(&mut self, update: UpdateUser) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
    }

    fn collection(state: &AppState) -> &RwLock<Collection<Self>> {
        &state.users
    }
}

impl Resource for Product {
    type Create = CreateProduct;
    type Update = UpdateProduct;

    fn create(id: u64, input: CreateProduct) -> Self {
        Product {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
        }
    }

    fn apply(&mut self, update: UpdateProduct) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
    }

    fn collection(state: &AppState) -> &RwLock<Collection<Self>> {
        &state.products
    }
}

#[derive(Default)]
pub struct AppState {
    users: RwLock<Collection<User>>,
    products: RwLock<Collection<Product>>,
    flaky_calls: AtomicU64,
    fault_hits: AtomicU64,
}

pub type Shared = Arc<AppState>;

pub fn app() -> Router {
    let state: Shared = Arc::new(AppState::default());
    Router::new()
        .route("/users", get(list_items::<User>).post(create_item::<User>))
        .route(
            "/users/{id}",
            get(get_item::<User>)
                .put(update_item::<User>)
                .delete(delete_item::<User>),
        )
        .route("/products", get(list_items::<Product>).post(create_item::<Product>))
        .route(
            "/products/{id}",
            get(get_item::<Product>)
                .put(update_item::<Product>)
                .delete(delete_item::<Product>),
        )
        .route("/status/{code}", get(fixed_status))
        .route("/flaky/{failures}", get(flaky))
        .route("/slow/{millis}", get(slow))
        .route("/echo", get(echo))
        .route("/hits", get(hits))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_items<T: Resource>(State(state): State<Shared>) -> Json<Vec<T>> {
    let rows = T::collection(&state).read().await;
    Json(rows.rows.values().cloned().collect())
}

async fn create_item<T: Resource>(
    State(state): State<Shared>,
    Json(input): Json<T::Create>,
) -> (StatusCode, Json<T>) {
    let mut rows = T::collection(&state).write().await;
    let id = rows.next_id;
    rows.next_id += 1;
    let item = T::create(id, input);
    rows.rows.insert(id, item.clone());
    (StatusCode::CREATED, Json(item))
}

async fn get_item<T: Resource>(
    State(state): State<Shared>,
    Path(id): Path<u64>,
) -> Result<Json<T>, StatusCode> {
    let rows = T::collection(&state).read().await;
    rows.rows.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_item<T: Resource>(
    State(state): State<Shared>,
    Path(id): Path<u64>,
    Json(input): Json<T::Update>,
) -> Result<Json<T>, StatusCode> {
    let mut rows = T::collection(&state).write().await;
    let item = rows.rows.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    item.apply(input);
    Ok(Json(item.clone()))
}

async fn delete_item<T: Resource>(
    State(state): State<Shared>,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let mut rows = T::collection(&state).write().await;
    rows.rows
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Always answers with `code`.
async fn fixed_status(State(state): State<Shared>, Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    state.fault_hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "status": status.as_u16() })))
}

/// 503 for the first `failures` calls on this server, 200 afterwards.
async fn flaky(State(state): State<Shared>, Path(failures): Path<u64>) -> (StatusCode, Json<Value>) {
    state.fault_hits.fetch_add(1, Ordering::SeqCst);
    let call = state.flaky_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if call <= failures {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "call": call, "error": "try again" })))
    } else {
        (StatusCode::OK, Json(json!({ "call": call })))
    }
}

async fn slow(State(state): State<Shared>, Path(millis): Path<u64>) -> Json<Value> {
    state.fault_hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({ "slept_ms": millis }))
}

/// Reflects query parameters and request headers.
async fn echo(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    state.fault_hits.fetch_add(1, Ordering::SeqCst);
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    Json(json!({ "query": query, "headers": headers }))
}

async fn hits(State(state): State<Shared>) -> Json<Value> {
    Json(json!({ "hits": state.fault_hits.load(Ordering::SeqCst) }))
}
