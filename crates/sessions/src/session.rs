//! Per-account session state.

use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;

use tgrelay_backend::MessagingBackend;

/// Authorization state of one account's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Connecting,
    AwaitingQr,
    Authorized,
    Failed,
}

/// One messaging account's live connection.
///
/// Owns the backend handle exclusively; the handle is created when the
/// account first logs in and dropped at process shutdown or explicit logout.
pub struct Session {
    account_id: String,
    backend: Arc<dyn MessagingBackend>,
    state: RwLock<AuthState>,
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(account_id: &str, backend: Arc<dyn MessagingBackend>) -> Self {
        Self {
            account_id: account_id.to_string(),
            backend,
            state: RwLock::new(AuthState::Connecting),
            cancel: CancellationToken::new(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn backend(&self) -> Arc<dyn MessagingBackend> {
        Arc::clone(&self.backend)
    }

    pub fn auth_state(&self) -> AuthState {
        *self.state.read().unwrap()
    }

    pub fn set_auth_state(&self, state: AuthState) {
        *self.state.write().unwrap() = state;
    }

    /// Token cancelling this session's background authorization wait.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the background authorization wait, if one is running.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
