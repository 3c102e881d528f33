//! Directory pass-through calls.
//!
//! Categories and services are opaque JSON to the session core. These calls
//! exist so that every request the application makes goes through
//! [`SessionClient::request`] and is subject to the same 401 handling.

use serde_json::Value;

use crate::client::{ApiError, SessionClient};

/// A CRUD collection exposed by the directory API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryResource {
    Categories,
    Services,
}

impl DirectoryResource {
    pub fn collection_path(&self) -> &'static str {
        match self {
            DirectoryResource::Categories => "/categories",
            DirectoryResource::Services => "/services",
        }
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.collection_path(), id)
    }
}

impl SessionClient {
    /// `GET /health`.
    pub async fn health_check(&self) -> Result<Value, ApiError> {
        self.get("/health").await
    }

    /// Lists a collection, forwarding `filters` as query parameters.
    pub async fn list(
        &self,
        resource: DirectoryResource,
        filters: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        if filters.is_empty() {
            self.get(resource.collection_path()).await
        } else {
            self.get_with_query(resource.collection_path(), filters).await
        }
    }

    pub async fn fetch(&self, resource: DirectoryResource, id: &str) -> Result<Value, ApiError> {
        self.get(&resource.item_path(id)).await
    }

    pub async fn create(
        &self,
        resource: DirectoryResource,
        body: Value,
    ) -> Result<Value, ApiError> {
        self.post(resource.collection_path(), body).await
    }

    pub async fn update(
        &self,
        resource: DirectoryResource,
        id: &str,
        body: Value,
    ) -> Result<Value, ApiError> {
        self.put(&resource.item_path(id), body).await
    }

    pub async fn remove(&self, resource: DirectoryResource, id: &str) -> Result<Value, ApiError> {
        self.delete(&resource.item_path(id)).await
    }
}
