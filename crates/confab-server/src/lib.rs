//! Ingestion HTTP surface: request decoding, authentication wiring, rate
//! limiting and the translation between wire payloads and the sync engine.
//! The binary in `main.rs` wires this against the real stores.

pub mod api;
pub mod auth;
pub mod body;
pub mod config;
pub mod error;
pub mod logging;
pub mod ratelimit;
pub mod shutdown;
