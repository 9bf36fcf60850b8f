use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method,
};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use url::Url;

use crate::{
    BoxError, CancellationWatcher, ClientOptions, HttpRequest, HttpResponse, JsonCodec,
    NonSuccessHandling, RestError, Result, Transport,
};

/// Header map shared between a client and its clones.
pub(crate) type SharedHeaders = Arc<RwLock<HeaderMap>>;

/// Result of one physical attempt, before classification.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The server answered with a status code and body.
    Response(HttpResponse),
    /// No status code was obtained.
    TransportFailure(BoxError),
}

/// What the retry loop does after classifying an [`Outcome`].
#[derive(Debug)]
pub(crate) enum Decision {
    Retry,
    Deserialize(HttpResponse),
    Fail(RestError),
}

/// Runs one logical call through as many physical attempts as the retry
/// policy allows.
#[derive(Clone)]
pub(crate) struct RequestExecutor {
    transport: Arc<dyn Transport>,
    base_uri: Url,
    options: Arc<ClientOptions>,
    codec: JsonCodec,
}

impl RequestExecutor {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        base_uri: Url,
        options: Arc<ClientOptions>,
    ) -> Self {
        let codec = JsonCodec::from_options(&options);
        Self {
            transport,
            base_uri,
            options,
            codec,
        }
    }

    pub(crate) fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    pub(crate) fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub(crate) fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    /// Executes `method` against `resource` and deserializes the final response.
    ///
    /// `headers` is read at every dispatch, so changes made between attempts
    /// are picked up by the next attempt.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        resource: &str,
        body: Option<String>,
        headers: &RwLock<HeaderMap>,
        mut cancel: Option<CancellationWatcher>,
    ) -> Result<T> {
        let url = self.resolve(resource)?;
        let policy = &self.options.retry_policy;
        let timeout = Duration::from_millis(self.options.timeout_ms);
        let mut attempt = 0usize;

        loop {
            let delay = policy.delay_before(attempt);
            if !delay.is_zero() {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "retrying {} {} (attempt {}) after {} ms",
                    method,
                    url,
                    attempt,
                    delay.as_millis()
                );
                guard(&mut cancel, sleep(delay)).await?;
            }

            let request = HttpRequest {
                method: method.clone(),
                url: url.clone(),
                headers: dispatch_headers(headers, body.is_some()),
                body: body.clone(),
                timeout,
            };

            #[cfg(feature = "tracing")]
            tracing::trace!("dispatching {} {} (attempt {})", method, url, attempt);

            let outcome = match guard(&mut cancel, self.transport.send(request)).await? {
                Ok(response) => Outcome::Response(response),
                Err(err) => Outcome::TransportFailure(err),
            };

            match self.classify(outcome, attempt) {
                Decision::Retry => attempt += 1,
                Decision::Deserialize(response) => {
                    return self.codec.deserialize(&response.body);
                }
                Decision::Fail(err) => return Err(err),
            }
        }
    }

    /// Classifies one attempt's outcome.
    ///
    /// A retryable status is retried before `ThrowError` is considered, so the
    /// error only surfaces once the retry budget is exhausted.
    pub(crate) fn classify(&self, outcome: Outcome, attempt: usize) -> Decision {
        let policy = &self.options.retry_policy;
        match outcome {
            Outcome::TransportFailure(err) => {
                if policy.should_retry_exception(attempt) {
                    Decision::Retry
                } else {
                    Decision::Fail(RestError::Transport(err))
                }
            }
            Outcome::Response(response) => {
                let status = response.status;
                if policy.should_retry_status(status.as_u16(), attempt) {
                    return Decision::Retry;
                }
                if self.options.non_success_handling == NonSuccessHandling::ThrowError
                    && !status.is_success()
                {
                    return Decision::Fail(RestError::Http {
                        status: status.as_u16(),
                        body: response.body,
                    });
                }
                Decision::Deserialize(response)
            }
        }
    }

    /// Resolves `resource` under the base URI.
    ///
    /// The result keeps the base scheme, host and port, and its path stays
    /// under the base path.
    pub(crate) fn resolve(&self, resource: &str) -> Result<Url> {
        let path = normalize_resource(resource)?;
        // "./" keeps a first segment such as `http:x` a path, not a scheme.
        let url = self
            .base_uri
            .join(&format!("./{path}"))
            .map_err(|err| RestError::invalid(format!("invalid resource '{resource}': {err}")))?;
        if !stays_under(&self.base_uri, &url) {
            return Err(RestError::invalid(format!(
                "resource '{resource}' resolves outside the base uri"
            )));
        }
        Ok(url)
    }
}

/// Strips leading separators so the path resolves relative to the base root.
pub(crate) fn normalize_resource(resource: &str) -> Result<&str> {
    let trimmed = resource.trim_start_matches(['/', '\\']);
    let path_part = trimmed.split(['?', '#']).next().unwrap_or_default();
    if path_part.contains("://") {
        return Err(RestError::invalid(format!(
            "resource must be a relative path, got '{resource}'"
        )));
    }
    Ok(trimmed)
}

fn stays_under(base: &Url, url: &Url) -> bool {
    url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default()
        && url.path().starts_with(base.path())
}

fn dispatch_headers(headers: &RwLock<HeaderMap>, has_body: bool) -> HeaderMap {
    let mut snapshot = headers
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if has_body && !snapshot.contains_key(header::CONTENT_TYPE) {
        snapshot.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
    }
    snapshot
}

async fn guard<F: Future>(cancel: &mut Option<CancellationWatcher>, fut: F) -> Result<F::Output> {
    match cancel {
        Some(watcher) => {
            tokio::select! {
                biased;
                _ = watcher.cancelled() => Err(RestError::Cancelled),
                output = fut => Ok(output),
            }
        }
        None => Ok(fut.await),
    }
}
