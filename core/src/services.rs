//! CRUD wrappers for the `/users` and `/products` resources.
//!
//! These only pick the path and verb; retry and classification stay in
//! `ApiClient`.

use serde::Serialize;
use tracing::info;

use crate::client::ApiClient;
use crate::error::ApiClientError;
use crate::http::HttpResponse;

/// Client for `/users`.
#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub const PATH: &'static str = "/users";

    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn list_users(&self) -> Result<HttpResponse, ApiClientError> {
        info!("listing users");
        self.client.get(Self::PATH, None)
    }

    pub fn get_user(&self, id: u64) -> Result<HttpResponse, ApiClientError> {
        info!(id, "fetching user");
        self.client.get(&format!("{}/{id}", Self::PATH), None)
    }

    pub fn create_user<B: Serialize + ?Sized>(&self, user: &B) -> Result<HttpResponse, ApiClientError> {
        info!("creating user");
        self.client.post(Self::PATH, user)
    }

    pub fn update_user<B: Serialize + ?Sized>(&self, id: u64, user: &B) -> Result<HttpResponse, ApiClientError> {
        info!(id, "updating user");
        self.client.put(&format!("{}/{id}", Self::PATH), user)
    }

    pub fn delete_user(&self, id: u64) -> Result<HttpResponse, ApiClientError> {
        info!(id, "deleting user");
        self.client.delete(&format!("{}/{id}", Self::PATH), None)
    }
}

/// Client for `/products`.
#[derive(Debug, Clone)]
pub struct ProductService {
    client: ApiClient,
}

impl ProductService {
    pub const PATH: &'static str = "/products";

    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn list_products(&self) -> Result<HttpResponse, ApiClientError> {
        info!("listing products");
        self.client.get(Self::PATH, None)
    }

    pub fn get_product(&self, id: u64) -> Result<HttpResponse, ApiClientError> {
        info!(id, "fetching product");
        self.client.get(&format!("{}/{id}", Self::PATH), None)
    }

    pub fn create_product<B: Serialize + ?Sized>(&self, product: &B) -> Result<HttpResponse, ApiClientError> {
        info!("creating product");
        self.client.post(Self::PATH, product)
    }

    pub fn update_product<B: Serialize + ?Sized>(
        &self,
        id: u64,
        product: &B,
    ) -> Result<HttpResponse, ApiClientError> {
        info!(id, "updating product");
        self.client.put(&format!("{}/{id}", Self::PATH), product)
    }

    pub fn delete_product(&self, id: u64) -> Result<HttpResponse, ApiClientError> {
        info!(id, "deleting product");
        self.client.delete(&format!("{}/{id}", Self::PATH), None)
    }
}
