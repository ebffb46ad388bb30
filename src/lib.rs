//! Asynchronous HTTP requests as cancellable, single-value streams.
//!
//! A request is described by a [`RequestObservable`] and does nothing until it is subscribed.
//! Each [`Subscription`] owns a fresh transport and yields exactly one item: a [`Response`] or
//! a [`FailureReason`]. Dropping the subscription early aborts the transport.

pub mod config;
pub mod errors;
pub mod net;

pub use config::{ClientConfig, ClientConfigBuilder, ClientConfigError};
pub use errors::{DecodeError, FailureReason, XhrError};
pub use net::{
    request, CredentialsMode, Headers, HttpTransportFactory, RequestConfig, RequestObservable, RequestState,
    Response, ResponseOptions, Subscription,
};
