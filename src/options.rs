use crate::{Credentials, RetryPolicy};

/// Behavior when a response status is outside the 2xx range.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NonSuccessHandling {
    /// Deserialize the response body regardless of status.
    #[default]
    Continue,
    /// Fail with [`RestError::Http`](crate::RestError::Http).
    ThrowError,
}

/// Whether null-valued members are written when serializing request data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NullHandling {
    Include,
    #[default]
    Omit,
}

/// Property name style applied when serializing request data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PropertyNaming {
    /// Names are written as produced by the type's `Serialize` impl.
    #[default]
    Unmodified,
    /// The first character of every member name is lowercased.
    CamelCase,
}

/// Configures authentication, serialization, timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Credentials for HTTP Basic authentication.
    pub authentication: Option<Credentials>,
    /// Handling of non-2xx responses.
    pub non_success_handling: NonSuccessHandling,
    /// Null member handling for request bodies and query objects.
    pub null_handling: NullHandling,
    /// Member naming for request bodies and query objects.
    pub property_naming: PropertyNaming,
    /// Request failure retry logic.
    pub retry_policy: RetryPolicy,
    /// Timeout per physical attempt in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            authentication: None,
            non_success_handling: NonSuccessHandling::Continue,
            null_handling: NullHandling::Omit,
            property_naming: PropertyNaming::Unmodified,
            retry_policy: RetryPolicy::default(),
            timeout_ms: 100_000,
        }
    }
}
