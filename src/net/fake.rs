//! Scripted in-memory transport.
//!
//! [`FakeServer`] is a [`TransportFactory`] that never touches the network. Every transport it
//! creates is recorded as a [`FakeRequest`], so tests can inspect what was sent (method, URL,
//! headers, credentials flag, body) and then decide how the request ends: a canned response,
//! a network error, a timeout, or nothing at all.
//!
//! Canned responses are registered with [`FakeServer::respond_with`] and handed out on
//! [`FakeServer::respond`]. Requests that match no route get a `404`.

use crate::net::headers::Headers;
use crate::net::transport::{RawResponse, Transport, TransportCallbacks, TransportFactory};
use http::StatusCode;
use std::sync::{Arc, Mutex, MutexGuard};

/// Canned response for a [`FakeServer`] route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Reported as the transport's response URL. Empty by default.
    pub response_url: String,
}

impl FakeResponse {
    pub fn new<I, K, V>(status: u16, headers: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            status,
            headers: headers.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            body: body.into(),
            response_url: String::new(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, Vec::<(String, String)>::new(), "")
    }

    pub fn with_response_url(mut self, url: impl Into<String>) -> Self {
        self.response_url = url.into();
        self
    }

    fn to_raw(&self) -> RawResponse {
        let raw_headers = self
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect::<String>();

        let status_text = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default();

        RawResponse {
            status: Some(self.status),
            status_text: status_text.to_string(),
            raw_headers: Some(raw_headers),
            response_url: self.response_url.clone(),
            response: None,
            response_text: self.body.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct FakeRequestState {
    method: String,
    url: String,
    with_credentials: Option<bool>,
    request_headers: Headers,
    body: Option<String>,
    sent: bool,
    aborted: bool,
    status: Option<u16>,
    callbacks: Option<TransportCallbacks>,
}

/// Handle to a request recorded by a [`FakeServer`].
#[derive(Debug, Clone, Default)]
pub struct FakeRequest {
    state: Arc<Mutex<FakeRequestState>>,
}

impl FakeRequest {
    fn lock(&self) -> MutexGuard<'_, FakeRequestState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn method(&self) -> String {
        self.lock().method.clone()
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// `None` when the credentials flag was never touched.
    pub fn with_credentials(&self) -> Option<bool> {
        self.lock().with_credentials
    }

    pub fn request_headers(&self) -> Headers {
        self.lock().request_headers.clone()
    }

    pub fn body(&self) -> Option<String> {
        self.lock().body.clone()
    }

    pub fn is_sent(&self) -> bool {
        self.lock().sent
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Status of the response handed out, if any.
    pub fn status(&self) -> Option<u16> {
        self.lock().status
    }

    /// Finishes the request with `response`.
    pub fn respond(&self, response: FakeResponse) {
        let callbacks = {
            let mut state = self.lock();
            state.status = Some(response.status);
            state.callbacks.clone()
        };
        if let Some(callbacks) = callbacks {
            callbacks.on_load(response.to_raw());
        }
    }

    /// Finishes the request with a network error.
    pub fn error(&self) {
        if let Some(callbacks) = self.callbacks() {
            callbacks.on_error();
        }
    }

    /// Finishes the request with a timeout.
    pub fn trigger_timeout(&self) {
        if let Some(callbacks) = self.callbacks() {
            callbacks.on_timeout();
        }
    }

    fn callbacks(&self) -> Option<TransportCallbacks> {
        self.lock().callbacks.clone()
    }
}

#[derive(Debug, Default)]
struct FakeServerState {
    requests: Vec<FakeRequest>,
    routes: Vec<(String, String, FakeResponse)>,
    respond_immediately: bool,
}

/// In-memory server handing out [`FakeTransport`]s. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<FakeServerState>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a canned response for `method` + `url`. Later registrations win.
    pub fn respond_with(&self, method: impl Into<String>, url: impl Into<String>, response: FakeResponse) {
        self.lock().routes.push((method.into(), url.into(), response));
    }

    /// Answer requests from inside `send`, before it returns.
    pub fn set_respond_immediately(&self, on: bool) {
        self.lock().respond_immediately = on;
    }

    /// All requests created so far, oldest first.
    pub fn requests(&self) -> Vec<FakeRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<FakeRequest> {
        self.lock().requests.last().cloned()
    }

    /// Answers every sent request that has not been answered or aborted yet.
    pub fn respond(&self) {
        for request in self.requests() {
            let pending = {
                let state = request.lock();
                state.sent && !state.aborted && state.status.is_none()
            };
            if pending {
                self.respond_to(&request);
            }
        }
    }

    fn respond_to(&self, request: &FakeRequest) {
        let (method, url) = {
            let state = request.lock();
            (state.method.clone(), state.url.clone())
        };
        let response = self.route(&method, &url).unwrap_or_else(FakeResponse::not_found);
        request.respond(response);
    }

    fn route(&self, method: &str, url: &str) -> Option<FakeResponse> {
        self.lock()
            .routes
            .iter()
            .rev()
            .find(|(m, u, _)| m.eq_ignore_ascii_case(method) && u == url)
            .map(|(_, _, r)| r.clone())
    }
}

impl TransportFactory for FakeServer {
    fn create(&self) -> Box<dyn Transport> {
        let request = FakeRequest::default();
        self.lock().requests.push(request.clone());
        Box::new(FakeTransport {
            server: self.clone(),
            request,
        })
    }
}

/// Transport created by a [`FakeServer`]; records everything into its [`FakeRequest`].
#[derive(Debug)]
pub struct FakeTransport {
    server: FakeServer,
    request: FakeRequest,
}

impl Transport for FakeTransport {
    fn open(&mut self, method: &str, url: &str) {
        let mut state = self.request.lock();
        state.method = method.to_string();
        state.url = url.to_string();
    }

    fn set_with_credentials(&mut self, with_credentials: bool) {
        self.request.lock().with_credentials = Some(with_credentials);
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.request.lock().request_headers.append(name, value);
    }

    fn send(&mut self, body: Option<String>, callbacks: TransportCallbacks) {
        {
            let mut state = self.request.lock();
            state.body = body;
            state.sent = true;
            state.callbacks = Some(callbacks);
        }

        let immediately = self.server.lock().respond_immediately;
        if immediately {
            self.server.respond_to(&self.request);
        }
    }

    fn abort(&mut self) {
        self.request.lock().aborted = true;
    }
}
