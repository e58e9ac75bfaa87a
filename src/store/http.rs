//! store::http
//!
//! Metadata store reached over a JSON REST API.
//!
//! # Design
//!
//! Each trait verb maps onto one HTTP request under `{base}/api/metadata/v1`:
//!
//! | Verb               | Request                                   |
//! |--------------------|-------------------------------------------|
//! | `get_type_by_name` | `GET /types?name=`                        |
//! | `create_type`      | `POST /types`                             |
//! | `get_node_by_name` | `GET /types/{id}/nodes/by-name?name=&scope=` |
//! | `get_node`         | `GET /nodes/{id}`                         |
//! | `create_node`      | `POST /nodes`                             |
//! | `update_node`      | `PATCH /nodes/{id}`                       |
//! | `list_nodes`       | `GET /types/{id}/nodes?...`               |
//!
//! # Deadlines
//!
//! The per-call timeout from [`CallOptions`] becomes the request timeout.
//! A request that runs past it fails with `StoreError::DeadlineExceeded`.
//! This store never retries on its own; retry policy belongs to the caller.
//!
//! # Example
//!
//! ```ignore
//! use model_registry::store::http::HttpStore;
//! use model_registry::store::{CallOptions, MetadataStore};
//!
//! let store = HttpStore::new("http://localhost:8080");
//! let schema = store.get_type_by_name("kf.RegisteredModel", &CallOptions::default()).await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    CallOptions, ListPage, ListRequest, MetadataStore, PropertyDelta, StoreError, TypeSchema,
    TypedNode,
};
use crate::core::types::{NodeId, TypeId};

/// Path prefix for all store endpoints.
const API_PREFIX: &str = "/api/metadata/v1";

/// Default User-Agent header value.
pub const DEFAULT_USER_AGENT: &str = "model-registry-client";

/// Metadata store client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStore {
    /// HTTP client for making requests
    client: Client,
    /// Base URL, without trailing slash (e.g. `http://localhost:8080`)
    base_url: String,
    /// User-Agent sent with every request
    user_agent: String,
}

impl HttpStore {
    /// Create a store client for the given base URL.
    ///
    /// # Example
    ///
    /// ```
    /// use model_registry::store::http::HttpStore;
    ///
    /// let store = HttpStore::new("http://localhost:8080/");
    /// assert_eq!(store.base_url(), "http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_user_agent(base_url, DEFAULT_USER_AGENT)
    }

    /// Create a store client with a custom User-Agent.
    pub fn with_user_agent(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            user_agent: user_agent.into(),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Build common headers for API requests.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        headers
    }

    /// Attach headers and the per-call deadline, then send.
    async fn send(&self, builder: RequestBuilder, opts: &CallOptions) -> Result<Response, StoreError> {
        let builder = builder.headers(self.headers());
        let builder = match opts.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        let response = builder.send().await.map_err(map_transport_error)?;
        debug!(
            url = %response.url(),
            status = response.status().as_u16(),
            "store response"
        );
        Ok(response)
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, StoreError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| StoreError::Api {
                status: status.as_u16(),
                message: format!("failed to parse response: {}", e),
            })
        } else {
            Err(self.handle_error_response(response, status).await)
        }
    }

    /// Handle a response that carries no body on success.
    async fn handle_empty_response(&self, response: Response) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.handle_error_response(response, status).await)
        }
    }

    /// Map an error response from the API.
    async fn handle_error_response(&self, response: Response, status: StatusCode) -> StoreError {
        let message = match response.json::<ErrorBody>().await {
            Ok(err) => err.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        let err = match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(message),
            StatusCode::CONFLICT => StoreError::AlreadyExists(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                StoreError::InvalidArgument(message)
            }
            StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => StoreError::Unavailable(message),
            _ => StoreError::Api {
                status: status.as_u16(),
                message,
            },
        };
        debug!(status = status.as_u16(), error = %err, "mapped error response");
        err
    }
}

/// Map a transport failure (no HTTP response) to a store error.
fn map_transport_error(err: reqwest::Error) -> StoreError {
    debug!(error = %err, timeout = err.is_timeout(), "store request failed");
    if err.is_timeout() {
        StoreError::DeadlineExceeded(err.to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl MetadataStore for HttpStore {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get_type_by_name(
        &self,
        name: &str,
        opts: &CallOptions,
    ) -> Result<TypeSchema, StoreError> {
        let request = self.client.get(self.url("/types")).query(&[("name", name)]);
        let response = self.send(request, opts).await?;
        self.handle_response(response).await
    }

    async fn create_type(
        &self,
        schema: TypeSchema,
        opts: &CallOptions,
    ) -> Result<TypeId, StoreError> {
        let request = self.client.post(self.url("/types")).json(&schema);
        let response = self.send(request, opts).await?;
        let created: CreatedBody<TypeId> = self.handle_response(response).await?;
        Ok(created.id)
    }

    async fn get_node_by_name(
        &self,
        type_id: TypeId,
        name: &str,
        scope: Option<NodeId>,
        opts: &CallOptions,
    ) -> Result<TypedNode, StoreError> {
        let mut query = vec![("name", name.to_string())];
        if let Some(scope) = scope {
            query.push(("scope", scope.to_string()));
        }
        let request = self
            .client
            .get(self.url(&format!("/types/{}/nodes/by-name", type_id)))
            .query(&query);
        let response = self.send(request, opts).await?;
        self.handle_response(response).await
    }

    async fn get_node(&self, id: NodeId, opts: &CallOptions) -> Result<TypedNode, StoreError> {
        let request = self.client.get(self.url(&format!("/nodes/{}", id)));
        let response = self.send(request, opts).await?;
        self.handle_response(response).await
    }

    async fn create_node(
        &self,
        node: TypedNode,
        opts: &CallOptions,
    ) -> Result<NodeId, StoreError> {
        let request = self.client.post(self.url("/nodes")).json(&node);
        let response = self.send(request, opts).await?;
        let created: CreatedBody<NodeId> = self.handle_response(response).await?;
        Ok(created.id)
    }

    async fn update_node(
        &self,
        id: NodeId,
        delta: PropertyDelta,
        opts: &CallOptions,
    ) -> Result<(), StoreError> {
        let request = self
            .client
            .patch(self.url(&format!("/nodes/{}", id)))
            .json(&delta);
        let response = self.send(request, opts).await?;
        self.handle_empty_response(response).await
    }

    async fn list_nodes(
        &self,
        request: ListRequest,
        opts: &CallOptions,
    ) -> Result<ListPage, StoreError> {
        let mut query = vec![
            ("pageSize", request.page_size.to_string()),
            ("orderBy", request.order_by.to_string()),
            ("sortOrder", request.sort_order.to_string()),
        ];
        if let Some(scope) = request.scope {
            query.push(("scope", scope.to_string()));
        }
        if let Some(pattern) = request.name_pattern {
            query.push(("namePattern", pattern));
        }
        if let Some(token) = request.page_token {
            query.push(("pageToken", token));
        }

        let builder = self
            .client
            .get(self.url(&format!("/types/{}/nodes", request.type_id)))
            .query(&query);
        let response = self.send(builder, opts).await?;
        self.handle_response(response).await
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Response body for create calls.
#[derive(Serialize, Deserialize)]
struct CreatedBody<T> {
    id: T,
}

/// Error response format.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
