//! HTTP client for the backend API.
//!
//! One request pipeline for every backend call: the current bearer token is
//! read from the session authority and attached before each request, success
//! payloads are unwrapped from the `{ "data": … }` envelope, and failures
//! are normalized into [`ApiError`]. A 401 response expires the session
//! through the authority — storage and in-memory state move together — and
//! the error is still propagated so callers can show their own notice.

pub mod error;

pub use error::{ApiError, GENERIC_ERROR};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::{debug, error};

use crate::auth::SessionAuthority;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Success envelope wrapping every payload the backend returns.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionAuthority>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionAuthority>) -> Result<Self> {
        Self::with_timeout(base_url, session, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        session: Arc<SessionAuthority>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer credential, if one is stored.
    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        self.send(self.http.put(self.url(path)).json(body)).await
    }

    /// `DELETE` carries no required response body; success is the status.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .with_auth(self.http.delete(self.url(path)))
            .send()
            .await
            .map_err(ApiError::Transport)?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(self.fail(response).await)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }

        match response.json::<Envelope<T>>().await {
            Ok(envelope) => Ok(envelope.data),
            Err(err) => {
                error!(error = %err, "Failed to decode response payload");
                Err(ApiError::Unknown)
            }
        }
    }

    /// Normalize a non-success response. On 401 the session is expired
    /// first so every observer of the authority sees the invalidation.
    async fn fail(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            debug!("Backend rejected the credential, expiring session");
            self.session.expire();
        }
        let body = response.bytes().await.unwrap_or_default();
        error::normalize(status, &body)
    }
}
