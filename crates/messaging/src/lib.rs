//! Conversation gateway: history listing and text/media sending on top of an
//! account's live session.

use std::{path::Path, sync::Arc};

use {serde::Serialize, tracing::{debug, warn}};

use {
    tgrelay_backend::{HistoryEntry, display_name},
    tgrelay_common::{Error, Result},
    tgrelay_sessions::SessionRegistry,
};

/// History fetch size used by the HTTP surface.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One conversation message, shaped for the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    #[serde(rename = "username")]
    pub display_name: String,
    #[serde(rename = "is_self")]
    pub is_outgoing: bool,
    #[serde(rename = "message_text")]
    pub text: String,
}

/// Message retrieval and sending for authorized sessions.
pub struct ConversationGateway {
    registry: Arc<SessionRegistry>,
}

impl ConversationGateway {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    fn session(&self, account_id: &str) -> Result<Arc<tgrelay_sessions::Session>> {
        self.registry
            .get(account_id)
            .ok_or_else(|| Error::SessionNotFound(account_id.to_string()))
    }

    /// List up to `limit` most recent messages with `counterpart`, newest
    /// first, resolving each sender to a display name.
    pub async fn list_recent(
        &self,
        account_id: &str,
        counterpart: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let backend = self.session(account_id)?.backend();
        let peer = backend.resolve_peer(counterpart).await?;
        let entries = backend.fetch_history(&peer, limit).await?;
        debug!(account_id, counterpart, count = entries.len(), "history fetched");

        let mut messages = Vec::with_capacity(entries.len());
        for HistoryEntry {
            sender_id,
            outgoing,
            text,
        } in entries
        {
            let display_name = match sender_id {
                Some(ref id) => display_name(&backend.resolve_sender(id).await?),
                None => String::new(),
            };
            messages.push(ChatMessage {
                display_name,
                is_outgoing: outgoing,
                text,
            });
        }
        Ok(messages)
    }

    /// Send a text message to `counterpart`.
    pub async fn send_text(&self, account_id: &str, counterpart: &str, text: &str) -> Result<()> {
        let backend = self.session(account_id)?.backend();
        let peer = backend.resolve_peer(counterpart).await?;
        backend.send_text(&peer, text).await?;
        debug!(account_id, counterpart, "text sent");
        Ok(())
    }

    /// Send raw bytes to `counterpart` as a document attachment.
    ///
    /// The bytes are staged in a named temporary file that keeps the original
    /// file extension; the file is removed on every exit path, including a
    /// failed send.
    pub async fn send_media(
        &self,
        account_id: &str,
        counterpart: &str,
        bytes: &[u8],
        original_file_name: &str,
    ) -> Result<()> {
        let backend = self.session(account_id)?.backend();
        let peer = backend.resolve_peer(counterpart).await?;

        let mut builder = tempfile::Builder::new();
        let suffix = Path::new(original_file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"));
        if let Some(ref suffix) = suffix {
            builder.suffix(suffix);
        }
        let staged = builder.tempfile().map_err(Error::unexpected)?;
        tokio::fs::write(staged.path(), bytes)
            .await
            .map_err(Error::unexpected)?;

        let sent = backend.send_file(&peer, staged.path()).await;
        // Deletion also happens on drop for the early-return paths above.
        if let Err(e) = staged.close() {
            warn!(account_id, error = %e, "failed to remove media temp file");
        }
        sent?;
        debug!(account_id, counterpart, original_file_name, "media sent");
        Ok(())
    }
}
