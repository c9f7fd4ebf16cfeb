//! Collaborator contracts: transport, DRM capability, and catalog sync.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// HTTP methods the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
}

/// A request built by the engine, executed by a [`NetworkExecutor`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn put(url: Url, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Put,
            url,
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// The value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure.
#[derive(Error, Debug, Clone)]
pub enum NetworkFailure {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl NetworkFailure {
    pub fn is_transient(&self) -> bool {
        matches!(self, NetworkFailure::Timeout | NetworkFailure::Connect(_))
    }
}

/// Executes the HTTP exchanges the engine builds.
///
/// The engine interprets status codes and problem documents itself; the
/// executor only moves bytes. Challenge-based basic auth is the executor's
/// concern, which is why credentials for basic schemes never appear in the
/// request the engine builds.
#[async_trait]
pub trait NetworkExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkFailure>;
}

/// Production executor backed by reqwest.
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(timeout: Duration) -> Result<Self, NetworkFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkFailure::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkFailure> {
        debug!(method = ?request.method, url = %request.url, "Dispatching request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Put => self.client.put(request.url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkFailure::Timeout
            } else if e.is_connect() {
                NetworkFailure::Connect(e.to_string())
            } else {
                NetworkFailure::Other(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkFailure::Other(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

/// A completed DRM device activation.
#[derive(Debug, Clone)]
pub struct DrmActivation {
    pub user_id: String,
    pub device_id: String,
}

/// DRM-side failure.
#[derive(Error, Debug, Clone)]
pub enum DrmFailure {
    /// The vendor rejected the activation (bad token, device limit, ...)
    #[error("Activation rejected: {0}")]
    Rejected(String),

    /// The vendor library could not be reached or initialized
    #[error("DRM unavailable: {0}")]
    Unavailable(String),
}

/// Vendor DRM capability, injected at startup.
///
/// The engine treats DRM as opaque: it supplies the vendor id and the
/// credentials split out of the profile's client token, and persists
/// whatever identifiers come back.
#[async_trait]
pub trait DrmAuthorizing: Send + Sync {
    async fn authorize(
        &self,
        vendor_id: &str,
        username: &str,
        password: &str,
    ) -> Result<DrmActivation, DrmFailure>;

    async fn deauthorize(
        &self,
        username: &str,
        password: &str,
        user_id: &str,
        device_id: &str,
    ) -> Result<(), DrmFailure>;
}

/// Catalog/book registry hooks invoked around sign-in state changes.
#[async_trait]
pub trait BookRegistrySyncing: Send + Sync {
    async fn sync_resetting_cache(&self, reset_cache: bool);
    async fn save(&self);
    async fn reset(&self, library_uuid: &str);
}

/// Registry that does nothing, for tests and headless use.
pub struct NoopBookRegistry;

#[async_trait]
impl BookRegistrySyncing for NoopBookRegistry {
    async fn sync_resetting_cache(&self, _reset_cache: bool) {}
    async fn save(&self) {}
    async fn reset(&self, _library_uuid: &str) {}
}
