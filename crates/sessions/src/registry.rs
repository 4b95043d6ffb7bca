//! Process-wide session registry.

use std::{sync::Arc, time::Duration};

use {
    dashmap::DashMap,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use tgrelay_backend::BackendFactory;

use tgrelay_common::Result;

use crate::session::{AuthState, Session};

/// Upper bound on logout+disconnect for a single session during shutdown, so
/// one wedged backend cannot stall the sweep.
const SHUTDOWN_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Mapping from account id (phone number) to its live [`Session`].
///
/// State is keyed by account; requests for different accounts never contend.
/// Session creation for the same account is serialized by a per-key mutex so
/// a login race cannot construct duplicate backend handles.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    creating: DashMap<String, Arc<Mutex<()>>>,
    factory: Arc<dyn BackendFactory>,
}

impl SessionRegistry {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            sessions: DashMap::new(),
            creating: DashMap::new(),
            factory,
        }
    }

    pub fn get(&self, account_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(account_id).map(|s| Arc::clone(s.value()))
    }

    /// Return the account's session, constructing or replacing the backend
    /// handle as needed.
    ///
    /// An existing session whose backend reports Authorized is returned
    /// unchanged. Anything else gets a freshly constructed handle in
    /// `Connecting` state, and the previous session's background work is
    /// cancelled first.
    pub async fn get_or_create(&self, account_id: &str) -> Result<Arc<Session>> {
        let guard = self
            .creating
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _creating = guard.lock().await;

        if let Some(existing) = self.get(account_id) {
            match existing.backend().is_authorized().await {
                Ok(true) => {
                    existing.set_auth_state(AuthState::Authorized);
                    return Ok(existing);
                },
                Ok(false) => {},
                Err(e) => {
                    debug!(account_id, error = %e, "authorization probe failed, rebuilding session");
                },
            }
            existing.cancel();
        }

        let backend = self.factory.create(account_id).await?;
        let session = Arc::new(Session::new(account_id, backend));
        self.sessions
            .insert(account_id.to_string(), Arc::clone(&session));
        debug!(account_id, "session created");
        Ok(session)
    }

    /// Tear down every session: cancel its background work, then best-effort
    /// logout and disconnect. Failures are logged per session and never abort
    /// the sweep. The registry is empty afterwards.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.sessions.clear();
        self.creating.clear();

        if sessions.is_empty() {
            info!("no sessions to shut down");
            return;
        }

        for session in sessions {
            let account_id = session.account_id();
            info!(account_id, "shutting down session");
            session.cancel();

            let backend = session.backend();
            let teardown = async {
                if let Err(e) = backend.logout().await {
                    warn!(account_id, error = %e, "logout failed");
                }
                if let Err(e) = backend.disconnect().await {
                    warn!(account_id, error = %e, "disconnect failed");
                }
            };
            if tokio::time::timeout(SHUTDOWN_STEP_TIMEOUT, teardown)
                .await
                .is_err()
            {
                warn!(account_id, "session shutdown timed out");
            }
        }
    }
}
