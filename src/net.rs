//! Networking: the request observable, its response model and the transports driving it.

pub mod fake;
mod fetch;
pub mod headers;
mod observable;
mod options;
mod response;
pub mod transport;

pub use fetch::{HttpTransport, HttpTransportFactory};
pub use headers::Headers;
pub use observable::{request, RequestObservable, RequestState, Subscription};
pub use options::{CredentialsMode, RequestConfig, RequestConfigBuilder, UnknownCredentialsMode};
pub use response::{Response, ResponseOptions};
pub use transport::{RawResponse, RequestId, Transport, TransportCallbacks, TransportFactory};
