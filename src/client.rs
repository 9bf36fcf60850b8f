use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    executor::{RequestExecutor, SharedHeaders},
    CancellationToken, CancellationWatcher, ClientOptions, Credentials, JsonCodec,
    ReqwestTransport, RestError, Result, Transport,
};

#[derive(Clone)]
/// JSON-over-HTTP client rooted at a base URI.
///
/// Clones share the transport, options and header map. Header changes made
/// through [`JsonRestClient::set_header`] are visible to every clone from the
/// next dispatch onwards, including retries of calls already in flight.
pub struct JsonRestClient {
    executor: RequestExecutor,
    headers: SharedHeaders,
    cancel: Option<CancellationWatcher>,
}

impl fmt::Debug for JsonRestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<String> = self
            .read_headers()
            .keys()
            .map(|name| name.as_str().to_owned())
            .collect();
        f.debug_struct("JsonRestClient")
            .field("base_uri", &self.executor.base_uri().as_str())
            .field("headers", &header_names)
            .field("options", self.executor.options())
            .finish()
    }
}

impl JsonRestClient {
    /// Creates a client with default options.
    pub fn new(base_uri: &str) -> Result<Self> {
        Self::with_options(base_uri, ClientOptions::default())
    }

    /// Creates a client backed by a fresh `reqwest` transport.
    pub fn with_options(base_uri: &str, options: ClientOptions) -> Result<Self> {
        Self::with_transport(base_uri, options, ReqwestTransport::new())
    }

    /// Creates a client that dispatches through `transport`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use jsonrest_http::{ClientOptions, JsonRestClient, ReqwestTransport};
    ///
    /// let http = reqwest::Client::builder().build().expect("client");
    /// let client = JsonRestClient::with_transport(
    ///     "https://api.example.com/v1",
    ///     ClientOptions::default(),
    ///     ReqwestTransport::from_client(http),
    /// )
    /// .expect("valid base uri");
    /// ```
    pub fn with_transport(
        base_uri: &str,
        options: ClientOptions,
        transport: impl Transport + 'static,
    ) -> Result<Self> {
        let base_uri = parse_base_uri(base_uri)?;

        let mut headers = HeaderMap::new();
        if let Some(credentials) = &options.authentication {
            headers.insert(header::AUTHORIZATION, authorization_value(credentials)?);
        }

        Ok(Self {
            executor: RequestExecutor::new(Arc::new(transport), base_uri, Arc::new(options)),
            headers: Arc::new(RwLock::new(headers)),
            cancel: None,
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `JSONREST_BASE_URI` — root URI of the API
    /// - `JSONREST_USERNAME` / `JSONREST_PASSWORD` — optional Basic credentials,
    ///   both or neither
    ///
    /// # Example
    ///
    /// ```no_run
    /// use jsonrest_http::JsonRestClient;
    ///
    /// let client = JsonRestClient::from_env().expect("missing JSONREST_* env vars");
    /// ```
    pub fn from_env() -> Result<Self> {
        let base_uri = std::env::var("JSONREST_BASE_URI").map_err(|_| {
            RestError::invalid("missing JSONREST_BASE_URI environment variable")
        })?;
        let username = std::env::var("JSONREST_USERNAME").ok();
        let password = std::env::var("JSONREST_PASSWORD").ok();

        let authentication = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)?),
            (None, None) => None,
            _ => {
                return Err(RestError::invalid(
                    "JSONREST_USERNAME and JSONREST_PASSWORD must be set together",
                ))
            }
        };

        Self::with_options(
            &base_uri,
            ClientOptions {
                authentication,
                ..ClientOptions::default()
            },
        )
    }

    /// Returns a clone whose calls abort when `token` is cancelled,
    /// including any pending retry delay.
    pub fn with_cancellation(&self, token: &CancellationToken) -> Self {
        Self {
            cancel: Some(token.watcher()),
            ..self.clone()
        }
    }

    /// Base URI with the trailing separator applied.
    pub fn base_uri(&self) -> &Url {
        self.executor.base_uri()
    }

    pub fn options(&self) -> &ClientOptions {
        self.executor.options()
    }

    /// Returns the current value of a default header.
    pub fn header(&self, name: &str) -> Option<String> {
        self.read_headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    /// Returns a snapshot of the default headers.
    pub fn headers(&self) -> HeaderMap {
        self.read_headers().clone()
    }

    /// Sets a default header sent with every subsequent attempt.
    pub fn set_header(&self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| RestError::invalid(format!("invalid header name '{name}': {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| RestError::invalid(format!("invalid value for header '{name}': {err}")))?;
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
        Ok(())
    }

    /// Removes a default header, returning its previous value.
    pub fn remove_header(&self, name: &str) -> Option<String> {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    /// Performs a GET request.
    pub async fn get<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.send(Method::GET, resource, None).await
    }

    /// Performs a GET request with `query` serialized into the query string.
    ///
    /// `query` must serialize to a flat JSON object; the options' null handling
    /// and property naming apply to it.
    pub async fn get_with_query<T, Q>(&self, resource: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let query_string = self.codec().to_query_string(query)?;
        let resource = append_query(resource, &query_string);
        self.send(Method::GET, &resource, None).await
    }

    /// Performs a POST request with a JSON body.
    pub async fn post<T, B>(&self, resource: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = self.codec().serialize(body)?;
        self.send(Method::POST, resource, Some(body)).await
    }

    /// Performs a PUT request with a JSON body.
    pub async fn put<T, B>(&self, resource: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = self.codec().serialize(body)?;
        self.send(Method::PUT, resource, Some(body)).await
    }

    /// Performs a PATCH request with a JSON body.
    pub async fn patch<T, B>(&self, resource: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = self.codec().serialize(body)?;
        self.send(Method::PATCH, resource, Some(body)).await
    }

    /// Performs a DELETE request.
    pub async fn delete<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.send(Method::DELETE, resource, None).await
    }

    fn codec(&self) -> &JsonCodec {
        self.executor.codec()
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        resource: &str,
        body: Option<String>,
    ) -> Result<T> {
        self.executor
            .execute(method, resource, body, &self.headers, self.cancel.clone())
            .await
    }

    fn read_headers(&self) -> std::sync::RwLockReadGuard<'_, HeaderMap> {
        self.headers.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_base_uri(base_uri: &str) -> Result<Url> {
    let trimmed = base_uri.trim();
    if trimmed.is_empty() {
        return Err(RestError::invalid("base uri cannot be empty"));
    }

    // Without a trailing separator, relative joins replace the last segment.
    let with_separator = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_separator)
        .map_err(|err| RestError::invalid(format!("invalid base uri '{base_uri}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(RestError::invalid(format!(
            "base uri '{base_uri}' cannot be used as a base"
        )));
    }
    Ok(url)
}

fn authorization_value(credentials: &Credentials) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&credentials.header_value())
        .map_err(|err| RestError::invalid(format!("invalid credentials: {err}")))?;
    value.set_sensitive(true);
    Ok(value)
}

fn append_query(resource: &str, query_string: &str) -> String {
    if query_string.is_empty() {
        return resource.to_owned();
    }
    let separator = if resource.contains('?') { '&' } else { '?' };
    format!("{resource}{separator}{query_string}")
}
