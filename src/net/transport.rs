//! Transport abstraction.
//!
//! A **transport** is the XHR-shaped primitive that actually talks to the network: it is
//! opened with a method and URL, configured with headers and a credentials flag, sent once,
//! and reports back through exactly one of three callbacks (load, error, timeout). It can be
//! aborted at any time.
//!
//! The request observable never touches the network itself. It drives a [`Transport`] created
//! by a [`TransportFactory`], so the same lifecycle runs on top of reqwest
//! ([`HttpTransportFactory`](crate::net::HttpTransportFactory)) or a scripted in-memory server
//! ([`FakeServer`](crate::net::fake::FakeServer)).
//!
//! Transports are always asynchronous. There is no blocking mode.

use crate::errors::FailureReason;
use crate::net::headers::Headers;
use crate::net::response::{Response, ResponseOptions};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Response header that carries the final URL when the transport cannot report one itself.
pub const REQUEST_URL_HEADER: &str = "X-Request-URL";

/// A unique identifier for a single request activation, used in log lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a transport reports when a response has been received completely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// Status code, if the transport knows it
    pub status: Option<u16>,
    /// Reason phrase as reported
    pub status_text: String,
    /// All response headers as one CRLF/LF separated blob
    pub raw_headers: Option<String>,
    /// Final URL after redirects, empty when unknown
    pub response_url: String,
    /// Structured response body, when the transport produced one
    pub response: Option<String>,
    /// Body as text
    pub response_text: String,
}

impl RawResponse {
    /// Normalizes the raw transport output into a [`Response`].
    ///
    /// The URL is the transport's response URL when non-empty, otherwise the
    /// [`REQUEST_URL_HEADER`] response header, otherwise empty.
    pub fn into_response(self) -> Response {
        let headers = Headers::parse(self.raw_headers.as_deref());

        let url = if self.response_url.is_empty() {
            headers.get(REQUEST_URL_HEADER).map(str::to_string)
        } else {
            Some(self.response_url)
        };

        let body = self.response.unwrap_or(self.response_text);

        Response::new(
            body,
            ResponseOptions {
                status: self.status,
                status_text: Some(self.status_text),
                headers,
                url,
            },
        )
    }
}

/// XHR-like transport driven by a request subscription.
///
/// Calls arrive in this order: `open`, optionally `set_with_credentials`, zero or more
/// `set_request_header`, then `send`. `abort` may be called at any point after `open`.
pub trait Transport: Send {
    /// Binds the transport to a method and URL. Nothing is validated yet.
    fn open(&mut self, method: &str, url: &str);

    /// Forces credentialed (`true`) or anonymous (`false`) requests. Not calling this keeps
    /// the transport default.
    fn set_with_credentials(&mut self, with_credentials: bool);

    /// Adds a single request header.
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Starts the request. Exactly one of the callbacks must eventually fire, unless the
    /// transport is aborted. Callbacks may fire before `send` returns.
    fn send(&mut self, body: Option<String>, callbacks: TransportCallbacks);

    /// Cancels the request. Best effort, no callback fires afterwards.
    fn abort(&mut self);
}

/// Creates a fresh transport for every activation.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Box<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn() -> Box<dyn Transport> + Send + Sync,
{
    fn create(&self) -> Box<dyn Transport> {
        self()
    }
}

pub(crate) type Outcome = Result<Response, FailureReason>;

struct Completion {
    id: RequestId,
    terminated: Arc<AtomicBool>,
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

/// The load/error/timeout callbacks handed to [`Transport::send`].
///
/// Cloning is cheap and all clones share one terminal guard: whichever callback fires first
/// delivers the outcome, everything after it is ignored. When every clone is dropped without
/// firing, the subscription sees a network error.
#[derive(Clone)]
pub struct TransportCallbacks {
    inner: Arc<Completion>,
}

impl TransportCallbacks {
    pub(crate) fn new(id: RequestId, terminated: Arc<AtomicBool>) -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let callbacks = Self {
            inner: Arc::new(Completion {
                id,
                terminated,
                tx: Mutex::new(Some(tx)),
            }),
        };
        (callbacks, rx)
    }

    /// The response has been received completely.
    pub fn on_load(&self, raw: RawResponse) {
        self.finish("load", || Ok(raw.into_response()));
    }

    /// The request failed at the network level.
    pub fn on_error(&self) {
        self.finish("error", || Err(FailureReason::NetworkError));
    }

    /// The transport's deadline passed.
    pub fn on_timeout(&self) {
        self.finish("timeout", || Err(FailureReason::TimeoutError));
    }

    /// Returns true once a terminal callback fired or the request was cancelled.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::Acquire)
    }

    pub fn request_id(&self) -> RequestId {
        self.inner.id
    }

    fn finish(&self, event: &str, outcome: impl FnOnce() -> Outcome) {
        if self.inner.terminated.swap(true, Ordering::AcqRel) {
            log::debug!("Request[{}]: ignoring {event} callback after termination", self.inner.id);
            return;
        }

        let tx = self
            .inner
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        log::debug!("Request[{}]: terminated by {event}", self.inner.id);
        if let Some(tx) = tx {
            // Receiver is gone when the subscription was dropped in the meantime
            let _ = tx.send(outcome());
        }
    }
}

impl fmt::Debug for TransportCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportCallbacks")
            .field("id", &self.inner.id)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
