//! Session registry and QR-login flow.
//!
//! One [`session::Session`] exists per account at any time, holding the
//! backend handle and its authorization state. Sessions live in memory only;
//! no session files or other durable artifacts are ever written.

pub mod login;
pub mod qr;
pub mod registry;
pub mod session;

pub use {
    login::{LoginFlow, LoginOutcome, LoginStatus},
    registry::SessionRegistry,
    session::{AuthState, Session},
};
