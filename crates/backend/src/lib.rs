//! Messaging backend adapter for tgrelay.
//!
//! The actual messaging protocol (transport, encryption, account
//! authorization) lives in an external bridge daemon; this crate only defines
//! the capability interface the rest of the workspace talks to, plus the
//! HTTP client that reaches the bridge.

pub mod adapter;
pub mod bridge;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use {
    adapter::{BackendFactory, MessagingBackend},
    bridge::{BridgeConfig, BridgeFactory},
    types::{HistoryEntry, PeerId, Sender, display_name},
};
