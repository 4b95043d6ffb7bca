//! HTTP surface for tgrelay.
//!
//! Routes requests onto the session registry, the conversation gateway and
//! the product search strategy. Paths and wire shapes are stable; clients
//! poll `/qr_code/{phone}` and `/check/login` during the QR handshake.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use {
    config::GatewayConfig,
    server::{AppState, router, serve},
};
