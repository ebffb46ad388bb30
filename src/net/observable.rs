//! Requests as cold, single-value streams.
//!
//! A [`RequestObservable`] only *describes* a request. Nothing happens until
//! [`subscribe`](RequestObservable::subscribe) is called. Every subscription creates a brand
//! new transport, configures it and sends it, then returns a [`Subscription`] that yields
//! exactly one item (the [`Response`] or the [`FailureReason`]) and ends.
//!
//! Dropping a subscription before it produced its item cancels the request: the transport is
//! aborted and nothing is ever emitted.
//!
//! ```no_run
//! # use gosub_xhr::{request, RequestConfig};
//! # use futures::StreamExt;
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let user = request("https://example.com/api/user", RequestConfig::default())?;
//! let mut sub = user.subscribe();
//! if let Some(Ok(response)) = sub.next().await {
//!     println!("{} {}", response.status, response.body);
//! }
//! # Ok(()) }
//! ```

use crate::config::ClientConfig;
use crate::errors::{FailureReason, XhrError};
use crate::net::fetch::HttpTransportFactory;
use crate::net::options::{CredentialsMode, RequestConfig};
use crate::net::response::Response;
use crate::net::transport::{Outcome, RequestId, Transport, TransportCallbacks, TransportFactory};
use futures::stream::{FusedStream, Stream};
use futures::StreamExt;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Creates a request observable backed by the default reqwest transport.
///
/// Needs to be called from within a tokio runtime.
pub fn request(url: impl Into<String>, config: RequestConfig) -> Result<RequestObservable, XhrError> {
    let factory = HttpTransportFactory::new(ClientConfig::default())?;
    Ok(RequestObservable::new(url, config, Arc::new(factory)))
}

/// Lifecycle of a single subscription.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestState {
    /// Nothing has been done yet
    #[default]
    Idle,
    /// A transport has been created and is being configured
    Opening,
    /// The request has been sent, waiting for the transport
    Pending,
    /// A response has been delivered
    Completed,
    /// A network error has been delivered
    Failed,
    /// A timeout has been delivered
    TimedOut,
    /// The consumer went away before a terminal event
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::Failed | RequestState::TimedOut | RequestState::Cancelled
        )
    }

    fn advance(&mut self, id: RequestId, next: RequestState) {
        log::trace!("Request[{id}]: {self:?} -> {next:?}");
        *self = next;
    }

    fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Ok(_) => RequestState::Completed,
            Err(FailureReason::NetworkError) => RequestState::Failed,
            Err(FailureReason::TimeoutError) => RequestState::TimedOut,
        }
    }
}

/// Cold description of a request. Subscribe to run it.
#[derive(Clone)]
pub struct RequestObservable {
    url: String,
    config: Arc<RequestConfig>,
    factory: Arc<dyn TransportFactory>,
}

impl RequestObservable {
    pub fn new(url: impl Into<String>, config: RequestConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            url: url.into(),
            config: Arc::new(config),
            factory,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Activates the request: creates a fresh transport, applies the configuration and sends it.
    ///
    /// Returns as soon as the request is on its way. The outcome is delivered through the
    /// returned [`Subscription`].
    pub fn subscribe(&self) -> Subscription {
        let id = RequestId::new();
        let terminated = Arc::new(AtomicBool::new(false));
        let (callbacks, rx) = TransportCallbacks::new(id, terminated.clone());

        let mut state = RequestState::Idle;
        state.advance(id, RequestState::Opening);
        let mut transport = self.factory.create();

        log::debug!("Request[{id}]: {} {}", self.config.method, self.url);
        transport.open(&self.config.method, &self.url);

        match self.config.credentials {
            CredentialsMode::Include => transport.set_with_credentials(true),
            CredentialsMode::Omit => transport.set_with_credentials(false),
            CredentialsMode::SameOrigin => {}
        }

        for (name, value) in self.config.headers.iter() {
            log::trace!("Request[{id}]: header {name}: {value}");
            transport.set_request_header(name, value);
        }

        transport.send(self.config.body.clone(), callbacks);
        state.advance(id, RequestState::Pending);

        Subscription {
            id,
            state,
            rx,
            guard: AbortGuard {
                id,
                transport,
                terminated,
            },
        }
    }
}

impl fmt::Debug for RequestObservable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestObservable")
            .field("url", &self.url)
            .field("config", &self.config)
            .field("factory", &"Arc<dyn TransportFactory>")
            .finish()
    }
}

/// Owns the transport of a subscription and aborts it on drop, unless a terminal callback
/// already fired.
struct AbortGuard {
    id: RequestId,
    transport: Box<dyn Transport>,
    terminated: Arc<AtomicBool>,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        // Claiming the guard here also makes any later callback a no-op
        if !self.terminated.swap(true, Ordering::AcqRel) {
            log::debug!("Request[{}]: {:?}, aborting transport", self.id, RequestState::Cancelled);
            self.transport.abort();
        }
    }
}

/// A running request. Yields one `Result<Response, FailureReason>` and then ends.
pub struct Subscription {
    id: RequestId,
    state: RequestState,
    rx: oneshot::Receiver<Outcome>,
    guard: AbortGuard,
}

impl Subscription {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Current lifecycle state. Becomes terminal once the item has been taken from the stream.
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Waits for the single outcome of this request.
    ///
    /// Returns `None` when the outcome was already taken from the stream.
    pub async fn outcome(mut self) -> Option<Result<Response, FailureReason>> {
        self.next().await
    }

    /// Cancels the request. Same as dropping the subscription.
    pub fn cancel(self) {
        drop(self)
    }
}

impl Stream for Subscription {
    type Item = Result<Response, FailureReason>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state.is_terminal() {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => {
                this.state.advance(this.id, RequestState::from_outcome(&outcome));
                Poll::Ready(Some(outcome))
            }
            Poll::Ready(Err(_)) => {
                log::warn!("Request[{}]: transport dropped its callbacks without reporting", this.id);
                this.guard.terminated.store(true, Ordering::Release);
                this.state.advance(this.id, RequestState::Failed);
                Poll::Ready(Some(Err(FailureReason::NetworkError)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.state.is_terminal() {
            (0, Some(0))
        } else {
            (1, Some(1))
        }
    }
}

impl FusedStream for Subscription {
    fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
