#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod bus;
pub mod channel;
pub mod config;
pub mod entities;
pub mod framework;
pub mod mailer;
pub mod pipeline;
pub mod processors;
pub mod secrets;
pub mod store;

pub use pipeline::Pipeline;
