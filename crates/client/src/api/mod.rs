//! HTTP client for the admin REST backend.
//!
//! Every request carries `Authorization: Bearer <token>` when a token is
//! stored. Successful bodies use a `{ "data": ... }` envelope. A `401`
//! on any call expires the [`Session`] before the error is returned.
//! Endpoint wrappers live in the submodules, one per resource.

pub mod auth;
pub mod bundles;
pub mod filters;
pub mod rows;
pub mod subject_services;
pub mod vouchers;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use eduadmin_core::search::{Page, Pagination, SearchQuery};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::Session;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

/// `{ "data": T }` response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Search responses: `{ "data": [T], "pagination": {...} }`.
#[derive(Debug, Deserialize)]
struct ListPage<T> {
    data: Option<ListData<T>>,
    pagination: Option<Pagination>,
}

/// `data` is either the list itself or an object keyed by the resource,
/// e.g. `{ "bundles": [T], "pagination": {...} }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListData<T> {
    Items(Vec<T>),
    Keyed {
        #[serde(alias = "bundles", alias = "rows", alias = "items")]
        list: Vec<T>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
}

impl<T> ListData<T> {
    fn into_parts(self) -> (Vec<T>, Option<Pagination>) {
        match self {
            Self::Items(items) => (items, None),
            Self::Keyed { list, pagination } => (list, pagination),
        }
    }
}

/// Error bodies carry `error` or `message`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn parse(bytes: &[u8]) -> Option<String> {
        let body: ErrorBody = serde_json::from_slice(bytes).ok()?;
        body.error
            .or(body.message)
            .filter(|m| !m.trim().is_empty())
    }
}

impl ApiClient {
    /// Build a client with the configured base URL and timeout.
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(http, config.base_url(), session))
    }

    /// Reuse an existing [`reqwest::Client`]; `base_url` already includes
    /// the version prefix.
    pub fn with_client(http: reqwest::Client, base_url: String, session: Arc<Session>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- request helpers ----

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and map non-2xx statuses to errors. A 401 expires the session.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let bytes = response.bytes().await.unwrap_or_default();
        let message = ErrorBody::parse(&bytes);

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %url, "Backend rejected credentials");
            self.session.expire();
            return Err(ClientError::Unauthorized { message });
        }

        tracing::warn!(path = %url, status = status.as_u16(), message = ?message, "API request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Send and decode the `data` of the envelope, if any.
    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }

    /// Like [`ApiClient::fetch`] but `data` must be present.
    async fn fetch_required<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        self.fetch(builder).await?.ok_or(ClientError::MissingData)
    }

    /// Like [`ApiClient::fetch`] with an absent `data` read as empty.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Vec<T>, ClientError> {
        Ok(self.fetch(builder).await?.unwrap_or_default())
    }

    /// Send a search and decode its page of results.
    async fn fetch_page<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        query: &SearchQuery,
    ) -> Result<Page<T>, ClientError> {
        let response = self.send(builder).await?;
        let body: ListPage<T> = serde_json::from_slice(&response.bytes().await?)?;
        let (items, nested) = body.data.map(ListData::into_parts).unwrap_or_default();
        Ok(Page {
            items,
            pagination: body
                .pagination
                .or(nested)
                .unwrap_or_default()
                .or_request(query.page, query.page_size),
        })
    }

    /// Send and discard the body.
    async fn execute(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        self.send(builder).await?;
        Ok(())
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RequestBuilder {
        self.request(Method::POST, path).json(body)
    }

    fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RequestBuilder {
        self.request(Method::PUT, path).json(body)
    }

    fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RequestBuilder {
        self.request(Method::PATCH, path).json(body)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }
}

/// Body of the `PATCH /{entity}/{id}` activation toggle.
#[derive(Debug, Serialize)]
struct SetActiveBody {
    is_active: bool,
}
