//! HTTP handlers.
//!
//! # Endpoints
//!
//! - `POST /webhook`      – accept an order webhook and publish it
//! - `GET /dead-letters`  – dead-letter depth, alarm state and parked messages

pub mod dead_letters;
pub mod webhook;
