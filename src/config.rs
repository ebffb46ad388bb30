//! Client configuration.
//!
//! `ClientConfig` controls how the default [`HttpTransportFactory`](crate::net::HttpTransportFactory)
//! talks to the network: which user agent it announces, how long a request may take before
//! the transport reports a timeout, and which origin counts as "same origin" when a request
//! leaves its credentials mode at the default.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_xhr::ClientConfig;
//! let cfg = ClientConfig::default();
//! assert!(cfg.timeout.is_none());
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_xhr::ClientConfig;
//! use std::time::Duration;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ClientConfig::builder()
//!     .user_agent("Gosub/0.1")
//!     .timeout(Duration::from_secs(10))
//!     .origin("https://example.com")
//!     .build()?; // returns Result<ClientConfig, ClientConfigError>
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! Builder validation returns [`ClientConfigError`] for a zero timeout, an empty user agent
//! or an origin that cannot be parsed (or is opaque, like `data:` URLs).

use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Gosub/1.0 (X11; Linux x86_64) Gecko/20250802 GosubBrowser/1.0";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string sent with every request
    pub user_agent: String,
    /// Deadline enforced by the transport. `None` waits forever, like XHR does.
    pub timeout: Option<Duration>,
    /// Origin of the document issuing requests. Used to resolve `same-origin` credentials.
    pub origin: Option<Url>,
    /// Keep cookies between credentialed requests
    pub cookie_store: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            origin: None,
            cookie_store: true,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    inner: ClientConfig,
    raw_origin: Option<String>,
}

impl ClientConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn timeout(self, timeout: Duration) -> Self { self.map(|c| c.timeout = Some(timeout)) }
    pub fn cookie_store(self, on: bool) -> Self { self.map(|c| c.cookie_store = on) }

    /// Origin is parsed (and validated) on `build()`.
    pub fn origin<S: Into<String>>(mut self, origin: S) -> Self {
        self.raw_origin = Some(origin.into());
        self
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ClientConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(mut self) -> Result<ClientConfig, ClientConfigError> {
        if let Some(raw) = self.raw_origin.take() {
            let url = Url::parse(&raw).map_err(|_| ClientConfigError::InvalidOrigin(raw.clone()))?;
            self.inner.origin = Some(url);
        }
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientConfigError {
    #[error("timeout must be larger than zero")]
    ZeroTimeout,
    #[error("user agent must not be empty")]
    EmptyUserAgent,
    #[error("origin {0:?} is not a valid tuple origin")]
    InvalidOrigin(String),
}

pub(crate) fn validate(c: &ClientConfig) -> Result<(), ClientConfigError> {
    if c.timeout == Some(Duration::ZERO) {
        return Err(ClientConfigError::ZeroTimeout);
    }
    if c.user_agent.trim().is_empty() {
        return Err(ClientConfigError::EmptyUserAgent);
    }
    if let Some(origin) = &c.origin {
        if !origin.origin().is_tuple() {
            return Err(ClientConfigError::InvalidOrigin(origin.to_string()));
        }
    }
    Ok(())
}
