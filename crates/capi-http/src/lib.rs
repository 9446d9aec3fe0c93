//! HTTP transport for the control-plane API.

mod http;
#[cfg(feature = "test-util")]
pub mod mock;

pub use capi_types::{ApiRequest, Headers, Method, RawResponse, Transport, TransportError};
pub use http::HttpTransport;

#[cfg(feature = "test-util")]
pub use mock::{MockTransport, RecordedRequest};
