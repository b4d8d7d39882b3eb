//! Remote document store access.
//!
//! [`ApiClient`] speaks the json-server contract (`/<collection>`, `/<collection>/<id>`),
//! [`ResourceService`] is the generic CRUD façade over one collection, and the
//! per-collection services add validation and derived queries on top.

mod courses;
mod enrollments;
mod users;
pub mod validation;

pub use courses::*;
pub use enrollments::*;
pub use users::*;

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::RecordId;

/// A document type stored in a named collection of the remote store.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name, used as the first path segment.
    const COLLECTION: &'static str;

    fn id(&self) -> &RecordId;
}

/// Thin HTTP client bound to the document store's base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a request and turn a non-success status into an [`AppError`].
    async fn send(&self, builder: RequestBuilder, context: &str) -> AppResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} failed with status {}", context, status);
            return Err(AppError::from_status(status, context));
        }
        Ok(response)
    }
}

/// Generic CRUD façade over one collection.
///
/// No caching and no version checks: every call goes to the remote store and the last
/// writer wins.
#[derive(Debug, Clone)]
pub struct ResourceService<T> {
    client: ApiClient,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceService<T> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }

    fn collection_path(&self) -> String {
        format!("/{}", T::COLLECTION)
    }

    fn item_path(&self, id: &RecordId) -> String {
        format!("/{}/{}", T::COLLECTION, id)
    }

    /// GET /<collection>?k=v - the store applies the filters, nothing else is done here.
    pub async fn list(&self, filters: &[(&str, &str)]) -> AppResult<Vec<T>> {
        tracing::debug!("GET /{} {:?}", T::COLLECTION, filters);
        let builder = self
            .client
            .request(Method::GET, &self.collection_path())
            .query(filters);
        let response = self.client.send(builder, T::COLLECTION).await?;
        Ok(response.json().await?)
    }

    /// First record matching the filters, if any.
    pub async fn find_one(&self, filters: &[(&str, &str)]) -> AppResult<Option<T>> {
        Ok(self.list(filters).await?.into_iter().next())
    }

    /// GET /<collection>/<id>. Any non-success status is reported as `NotFound`.
    pub async fn get_by_id(&self, id: &RecordId) -> AppResult<T> {
        let context = format!("{} {}", T::COLLECTION, id);
        let builder = self.client.request(Method::GET, &self.item_path(id));
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(AppError::NotFound(format!("{} not found", context)));
        }
        Ok(response.json().await?)
    }

    /// POST /<collection>. The store assigns the id.
    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> AppResult<T> {
        let builder = self
            .client
            .request(Method::POST, &self.collection_path())
            .json(body);
        let response = self.client.send(builder, T::COLLECTION).await?;
        let created: T = response.json().await?;
        tracing::info!("Created {} {}", T::COLLECTION, created.id());
        Ok(created)
    }

    /// PUT /<collection>/<id> - full replacement.
    pub async fn replace<B: Serialize + ?Sized>(&self, id: &RecordId, body: &B) -> AppResult<T> {
        let context = format!("{} {}", T::COLLECTION, id);
        let builder = self
            .client
            .request(Method::PUT, &self.item_path(id))
            .json(body);
        let response = self.client.send(builder, &context).await?;
        Ok(response.json().await?)
    }

    /// PATCH /<collection>/<id> - partial update.
    pub async fn patch<B: Serialize + ?Sized>(&self, id: &RecordId, body: &B) -> AppResult<T> {
        let context = format!("{} {}", T::COLLECTION, id);
        let builder = self
            .client
            .request(Method::PATCH, &self.item_path(id))
            .json(body);
        let response = self.client.send(builder, &context).await?;
        Ok(response.json().await?)
    }

    /// DELETE /<collection>/<id>.
    pub async fn delete(&self, id: &RecordId) -> AppResult<bool> {
        let context = format!("{} {}", T::COLLECTION, id);
        let builder = self.client.request(Method::DELETE, &self.item_path(id));
        self.client.send(builder, &context).await?;
        tracing::info!("Deleted {}", context);
        Ok(true)
    }
}
