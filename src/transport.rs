use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Method, StatusCode};
use url::Url;

use crate::BoxError;

/// One physical request handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Serialized JSON payload, if any.
    pub body: Option<String>,
    pub timeout: Duration,
}

/// Status code and body returned by a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends a single HTTP request.
///
/// Implement this trait to replace the network layer, for example with a
/// scripted double in tests. Errors are treated as transport failures and
/// are retried when the retry policy enables `OnException`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a preconfigured `reqwest` client (proxies, TLS roots, pooling).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
