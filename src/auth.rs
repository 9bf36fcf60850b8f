use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{RestError, Result};

/// Builds a Basic authentication header value.
///
/// Example: `("user", "pass")` → `"Basic dXNlcjpwYXNz"`
pub fn basic_auth_header(username: &str, password: &str) -> Result<String> {
    ensure_present("username", username)?;
    ensure_present("password", password)?;
    Ok(encode_basic(username, password))
}

fn encode_basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn ensure_present(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RestError::invalid(format!("{name} cannot be empty")));
    }
    Ok(())
}

/// Username and password for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Validates and stores a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let password = password.into();
        ensure_present("username", &username)?;
        ensure_present("password", &password)?;
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Formats the `Authorization` header value.
    pub fn header_value(&self) -> String {
        encode_basic(&self.username, &self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
