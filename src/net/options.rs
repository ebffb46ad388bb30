use crate::net::headers::Headers;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Credentials policy for a request, as in the fetch `credentials` option.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsMode {
    /// Always send credentials, also cross-origin
    Include,
    /// Never send credentials
    Omit,
    /// Leave the transport default untouched
    #[default]
    SameOrigin,
}

impl CredentialsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsMode::Include => "include",
            CredentialsMode::Omit => "omit",
            CredentialsMode::SameOrigin => "same-origin",
        }
    }
}

impl fmt::Display for CredentialsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown credentials mode {0:?} (expected include, omit or same-origin)")]
pub struct UnknownCredentialsMode(pub String);

impl FromStr for CredentialsMode {
    type Err = UnknownCredentialsMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "include" => Ok(CredentialsMode::Include),
            "omit" => Ok(CredentialsMode::Omit),
            "same-origin" => Ok(CredentialsMode::SameOrigin),
            other => Err(UnknownCredentialsMode(other.to_string())),
        }
    }
}

/// Everything needed to issue a request, apart from the URL.
///
/// Nothing is validated here. A bogus method or header only shows up once the transport
/// tries to send it, and then as a network error on the request stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    /// HTTP method, sent verbatim (default `GET`)
    pub method: String,
    /// Request headers, applied in order
    pub headers: Headers,
    /// Credentials policy (default `same-origin`)
    pub credentials: CredentialsMode,
    /// Request body, if any
    pub body: Option<String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: Headers::new(),
            credentials: CredentialsMode::default(),
            body: None,
        }
    }
}

impl RequestConfig {
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::default()
    }
}

/// Builder for [`RequestConfig`].
#[derive(Debug, Clone, Default)]
pub struct RequestConfigBuilder {
    inner: RequestConfig,
}

impl RequestConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut RequestConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn method<S: Into<String>>(self, method: S) -> Self { self.map(|c| c.method = method.into()) }
    pub fn header<K: Into<String>, V: Into<String>>(self, name: K, value: V) -> Self { self.map(|c| c.headers.append(name, value)) }
    pub fn headers(self, headers: Headers) -> Self { self.map(|c| c.headers = headers) }
    pub fn credentials(self, mode: CredentialsMode) -> Self { self.map(|c| c.credentials = mode) }
    pub fn body<S: Into<String>>(self, body: S) -> Self { self.map(|c| c.body = Some(body.into())) }

    pub fn build(self) -> RequestConfig {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RequestConfig::default();
        assert_eq!(cfg.method, "GET");
        assert!(cfg.headers.is_empty());
        assert_eq!(cfg.credentials, CredentialsMode::SameOrigin);
        assert!(cfg.body.is_none());
    }

    #[test]
    fn builder_keeps_header_order_and_spelling() {
        let cfg = RequestConfig::builder()
            .method("POST")
            .header("Content-Type", "application/json")
            .header("X-Trace", "abc")
            .credentials(CredentialsMode::Include)
            .body("{}")
            .build();

        assert_eq!(cfg.method, "POST");
        let names: Vec<_> = cfg.headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Content-Type", "X-Trace"]);
        assert_eq!(cfg.headers.get("content-type"), Some("application/json"));
        assert_eq!(cfg.body.as_deref(), Some("{}"));
    }

    #[test]
    fn credentials_mode_parses_and_displays() {
        for mode in [CredentialsMode::Include, CredentialsMode::Omit, CredentialsMode::SameOrigin] {
            assert_eq!(mode.to_string().parse::<CredentialsMode>().unwrap(), mode);
        }
        assert!("always".parse::<CredentialsMode>().is_err());
    }

    #[test]
    fn credentials_mode_serde_uses_fetch_names() {
        let json = serde_json::to_string(&CredentialsMode::SameOrigin).unwrap();
        assert_eq!(json, "\"same-origin\"");
        let mode: CredentialsMode = serde_json::from_str("\"omit\"").unwrap();
        assert_eq!(mode, CredentialsMode::Omit);
    }
}
