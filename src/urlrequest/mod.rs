//! Request lifecycle.
//!
//! - [`request`]: the immutable per-hop [`RequestDescriptor`](request::RequestDescriptor)
//! - [`job`]: the redirect state machine ([`URLRequestHttpJob`](job::URLRequestHttpJob))
//! - [`context`]: client configuration and per-request options

pub mod context;
pub mod job;
pub mod request;
