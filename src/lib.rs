//! `jsonrest-http` is an async JSON-over-HTTP client with configurable retries.
//!
//! [`JsonRestClient`] resolves relative resource paths under a base URI and
//! exposes one method per verb:
//! - [`JsonRestClient::get`] and [`JsonRestClient::get_with_query`]
//! - [`JsonRestClient::post`], [`JsonRestClient::put`], [`JsonRestClient::patch`]
//! - [`JsonRestClient::delete`]
//!
//! Failed attempts are retried according to the [`RetryPolicy`] in
//! [`ClientOptions`].

mod auth;
mod cancel;
mod client;
mod codec;
mod error;
mod executor;
mod list;
mod options;
mod retry;
mod transport;

pub mod converters;

pub use auth::{basic_auth_header, Credentials};
pub use cancel::{CancellationToken, CancellationWatcher};
pub use client::JsonRestClient;
pub use codec::JsonCodec;
pub use error::{BoxError, RestError};
pub use list::ListResponse;
pub use options::{ClientOptions, NonSuccessHandling, NullHandling, PropertyNaming};
pub use retry::{DelayMode, Retry, RetryPolicy, RetryTrigger, RetryTriggers};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub use reqwest::{Method, StatusCode};

pub type Result<T> = std::result::Result<T, RestError>;
