//! Capability interface over the remote messaging backend.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use tgrelay_common::Result;

use crate::types::{HistoryEntry, PeerId, Sender};

/// One authenticated account's connection to the messaging backend.
///
/// Implementations relay each call to the remote service exactly once; no
/// retry or backoff happens at this layer.
#[async_trait]
pub trait MessagingBackend: Send + Sync {
    /// Establish the transport connection for this account.
    async fn connect(&self) -> Result<()>;

    /// Wait for the user to confirm the QR challenge on their device.
    ///
    /// This blocks until the account becomes authorized, so callers drive it
    /// as a background task rather than awaiting it inline.
    async fn request_authorization(&self) -> Result<()>;

    /// Current authorization state of the account.
    async fn is_authorized(&self) -> Result<bool>;

    /// Fetch a fresh one-time QR challenge URL. Each call may rotate the
    /// token.
    async fn qr_challenge(&self) -> Result<String>;

    /// Resolve a username or phone identifier to a sendable peer.
    async fn resolve_peer(&self, name: &str) -> Result<PeerId>;

    /// Fetch up to `limit` most recent messages with `peer`, newest first.
    async fn fetch_history(&self, peer: &PeerId, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// Resolve a message sender id to its user/group/channel record.
    async fn resolve_sender(&self, sender_id: &str) -> Result<Sender>;

    /// Send a text message to `peer`.
    async fn send_text(&self, peer: &PeerId, text: &str) -> Result<()>;

    /// Send the file at `path` to `peer` as a document attachment.
    async fn send_file(&self, peer: &PeerId, path: &Path) -> Result<()>;

    /// Terminate the account authorization on the backend.
    async fn logout(&self) -> Result<()>;

    /// Tear down the transport connection.
    async fn disconnect(&self) -> Result<()>;
}

/// Constructs backend handles bound to an account, so the session registry
/// never names a concrete implementation.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn create(&self, account_id: &str) -> Result<Arc<dyn MessagingBackend>>;
}
