#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

//! Wire contract shared by the orderflow server and its callers.
//!
//! - [`objects`]: webhook request/response bodies, the order event and the
//!   bus/channel envelopes that carry it.
//! - `client` (feature `client`): typed HTTP client for the webhook endpoint.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
