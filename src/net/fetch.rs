//! Network transport backed by `reqwest`.
//!
//! [`HttpTransportFactory`] builds two clients from a [`ClientConfig`]: a credentialed one
//! (with a cookie store) and an anonymous one. Each [`HttpTransport`] picks one of them when
//! it is sent:
//!
//! - credentials flag `true` → credentialed client
//! - credentials flag `false` → anonymous client
//! - flag untouched → credentialed only when the request URL has the same origin as
//!   [`ClientConfig::origin`]
//!
//! Relative URLs are resolved against the configured origin. The request runs on a tokio task
//! and races a cancellation token, so `abort()` simply cancels the token.
use crate::config::{validate, ClientConfig};
use crate::errors::XhrError;
use crate::net::headers::raw_header_blob;
use crate::net::transport::{RawResponse, Transport, TransportCallbacks, TransportFactory};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, thiserror::Error)]
enum PrepareError {
    #[error("invalid method: {0}")]
    Method(#[from] http::method::InvalidMethod),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error(transparent)]
    Build(#[from] reqwest::Error),
}

#[derive(Debug)]
struct Clients {
    credentialed: reqwest::Client,
    anonymous: reqwest::Client,
    origin: Option<Url>,
}

/// Creates [`HttpTransport`]s sharing one pair of reqwest clients.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    clients: Arc<Clients>,
    runtime: Handle,
}

impl HttpTransportFactory {
    /// Builds a factory on the current tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self, XhrError> {
        let runtime = Handle::try_current().map_err(|_| XhrError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    /// Builds a factory whose requests are spawned on `runtime`.
    pub fn with_runtime(config: ClientConfig, runtime: Handle) -> Result<Self, XhrError> {
        validate(&config)?;

        let clients = Clients {
            credentialed: build_client(&config, config.cookie_store)?,
            anonymous: build_client(&config, false)?,
            origin: config.origin,
        };

        Ok(Self {
            clients: Arc::new(clients),
            runtime,
        })
    }
}

fn build_client(config: &ClientConfig, cookies: bool) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .cookie_store(cookies);

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(HttpTransport {
            clients: self.clients.clone(),
            runtime: self.runtime.clone(),
            method: String::new(),
            url: String::new(),
            with_credentials: None,
            headers: Vec::new(),
            cancel: CancellationToken::new(),
        })
    }
}

/// A single request over the network.
#[derive(Debug)]
pub struct HttpTransport {
    clients: Arc<Clients>,
    runtime: Handle,
    method: String,
    url: String,
    with_credentials: Option<bool>,
    headers: Vec<(String, String)>,
    cancel: CancellationToken,
}

impl HttpTransport {
    fn prepare(&self, body: Option<String>) -> Result<(reqwest::Client, reqwest::Request), PrepareError> {
        let method = Method::from_bytes(self.method.as_bytes())?;
        let url = match &self.clients.origin {
            Some(base) => base.join(&self.url)?,
            None => Url::parse(&self.url)?,
        };

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            headers.append(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(value)?);
        }

        let client = if self.use_credentials(&url) {
            self.clients.credentialed.clone()
        } else {
            self.clients.anonymous.clone()
        };

        let mut builder = client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let request = builder.build()?;

        Ok((client, request))
    }

    fn use_credentials(&self, url: &Url) -> bool {
        match self.with_credentials {
            Some(flag) => flag,
            None => self
                .clients
                .origin
                .as_ref()
                .is_some_and(|origin| origin.origin() == url.origin()),
        }
    }
}

impl Transport for HttpTransport {
    fn open(&mut self, method: &str, url: &str) {
        self.method = method.to_string();
        self.url = url.to_string();
    }

    fn set_with_credentials(&mut self, with_credentials: bool) {
        self.with_credentials = Some(with_credentials);
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, body: Option<String>, callbacks: TransportCallbacks) {
        let id = callbacks.request_id();
        let (client, request) = match self.prepare(body) {
            Ok(prepared) => prepared,
            Err(e) => {
                log::error!("Request[{id}]: cannot send {} {}: {e}", self.method, self.url);
                callbacks.on_error();
                return;
            }
        };

        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("Request[{id}]: transport aborted");
                }
                res = fetch(client, request) => {
                    match res {
                        Ok(raw) => callbacks.on_load(raw),
                        Err(e) if e.is_timeout() => {
                            log::debug!("Request[{id}]: timed out: {e}");
                            callbacks.on_timeout();
                        }
                        Err(e) => {
                            log::debug!("Request[{id}]: network error: {e}");
                            callbacks.on_error();
                        }
                    }
                }
            }
        });
    }

    fn abort(&mut self) {
        self.cancel.cancel();
    }
}

// Executes the request and buffers the whole response
async fn fetch(client: reqwest::Client, request: reqwest::Request) -> Result<RawResponse, reqwest::Error> {
    let res = client.execute(request).await?;

    // Fetch results
    let final_url = res.url().to_string();
    let status = res.status();
    let headers = res.headers().clone();

    // Fetch body. We don't do streaming. The charset from the content type is honored,
    // falling back to UTF-8 for unknown labels
    let body = res.text().await?;

    Ok(RawResponse {
        status: Some(status.as_u16()),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        raw_headers: Some(raw_header_blob(&headers)),
        response_url: final_url,
        response: None,
        response_text: body,
    })
}
