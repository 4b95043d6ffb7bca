//! QR-login flow.
//!
//! The flow is a two-actor handshake: this side obtains a rotating one-time
//! link from the backend and renders it as a scannable code; the user's
//! device performs the cryptographic confirmation out-of-band. Server-side
//! responsibility is state tracking and relay only.

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use tgrelay_common::{Error, Result};

use crate::{
    qr,
    registry::SessionRegistry,
    session::{AuthState, Session},
};

/// Upper bound on the background authorization wait, so an abandoned login
/// attempt cannot leak an immortal task.
const AUTH_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of a login request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStatus {
    Logined,
    WaitingQrLogin,
}

impl LoginStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logined => "logined",
            Self::WaitingQrLogin => "waiting_qr_login",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub status: LoginStatus,
    pub qr_link_url: Option<String>,
}

/// Orchestrates backend connection, challenge retrieval and authorization
/// polling on top of the [`SessionRegistry`].
pub struct LoginFlow {
    registry: Arc<SessionRegistry>,
}

impl LoginFlow {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Start (or short-circuit) a QR login for `account_id`.
    ///
    /// Returns `logined` with no URL when the account is already authorized.
    /// Otherwise connects a fresh backend handle, kicks off the authorization
    /// wait in the background — it must race with challenge retrieval, not
    /// block it — and returns the callback URL for the QR image, built
    /// against `public_base_url`.
    pub async fn begin_login(&self, account_id: &str, public_base_url: &str) -> Result<LoginOutcome> {
        let session = self.registry.get_or_create(account_id).await?;
        if session.auth_state() == AuthState::Authorized {
            debug!(account_id, "already authorized, login short-circuits");
            return Ok(LoginOutcome {
                status: LoginStatus::Logined,
                qr_link_url: None,
            });
        }

        session.backend().connect().await?;
        spawn_authorization_wait(&session);
        session.set_auth_state(AuthState::AwaitingQr);
        info!(account_id, "QR login started");

        let url = format!(
            "{}/qr_code/{}",
            public_base_url.trim_end_matches('/'),
            urlencoding::encode(account_id)
        );
        Ok(LoginOutcome {
            status: LoginStatus::WaitingQrLogin,
            qr_link_url: Some(url),
        })
    }

    /// Fetch a fresh one-time challenge from the backend and render it as a
    /// PNG. Each call may rotate the challenge token; callers poll this until
    /// the user scans.
    pub async fn challenge_png(&self, account_id: &str) -> Result<Vec<u8>> {
        let session = self
            .registry
            .get(account_id)
            .ok_or_else(|| Error::SessionNotFound(account_id.to_string()))?;
        let url = session.backend().qr_challenge().await?;
        qr::encode_png(&url)
    }

    /// Live read of the account's authorization state.
    pub async fn check_authorization(&self, account_id: &str) -> Result<bool> {
        let session = self
            .registry
            .get(account_id)
            .ok_or_else(|| Error::SessionNotFound(account_id.to_string()))?;
        let authorized = session.backend().is_authorized().await?;
        if authorized {
            session.set_auth_state(AuthState::Authorized);
        }
        Ok(authorized)
    }
}

/// Drive the backend's authorization wait concurrently with the QR handshake.
fn spawn_authorization_wait(session: &Arc<Session>) {
    let session = Arc::clone(session);
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        let account_id = session.account_id();
        let backend = session.backend();
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(account_id, "authorization wait cancelled");
            },
            waited = tokio::time::timeout(AUTH_WAIT_TIMEOUT, backend.request_authorization()) => {
                match waited {
                    Ok(Ok(())) => {
                        info!(account_id, "account authorized");
                        session.set_auth_state(AuthState::Authorized);
                    },
                    Ok(Err(e)) => {
                        warn!(account_id, error = %e, "authorization wait failed");
                        session.set_auth_state(AuthState::Failed);
                    },
                    Err(_) => {
                        warn!(account_id, "authorization wait timed out");
                    },
                }
            },
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use tgrelay_backend::testing::{MockBackend, MockFactory};

    const BASE: &str = "http://127.0.0.1:8000";

    fn flow_with(factory: Arc<MockFactory>) -> (LoginFlow, Arc<SessionRegistry>) {
        let registry = Arc::new(SessionRegistry::new(factory));
        (LoginFlow::new(Arc::clone(&registry)), registry)
    }

    #[tokio::test]
    async fn first_login_creates_one_session_and_waits_for_qr() {
        let factory = Arc::new(MockFactory::new());
        let (flow, registry) = flow_with(Arc::clone(&factory));

        let outcome = flow
            .begin_login("+15550001", BASE)
            .await
            .unwrap_or_else(|e| panic!("login failed: {e}"));

        assert_eq!(outcome.status, LoginStatus::WaitingQrLogin);
        assert_eq!(
            outcome.qr_link_url.as_deref(),
            Some("http://127.0.0.1:8000/qr_code/%2B15550001")
        );
        assert_eq!(factory.created(), 1);
        let session = registry
            .get("+15550001")
            .unwrap_or_else(|| panic!("session missing"));
        assert_eq!(session.auth_state(), AuthState::AwaitingQr);
    }

    #[tokio::test]
    async fn authorized_login_short_circuits_without_replacing() {
        let factory = Arc::new(MockFactory::new());
        let backend = Arc::new(MockBackend::new());
        factory.insert("+15550001", Arc::clone(&backend));
        let (flow, registry) = flow_with(Arc::clone(&factory));

        flow.begin_login("+15550001", BASE)
            .await
            .unwrap_or_else(|e| panic!("login failed: {e}"));
        let session = registry
            .get("+15550001")
            .unwrap_or_else(|| panic!("session missing"));

        backend.set_authorized(true);
        let outcome = flow
            .begin_login("+15550001", BASE)
            .await
            .unwrap_or_else(|e| panic!("login failed: {e}"));

        assert_eq!(outcome.status, LoginStatus::Logined);
        assert!(outcome.qr_link_url.is_none());
        assert_eq!(factory.created(), 1);
        let unchanged = registry
            .get("+15550001")
            .unwrap_or_else(|| panic!("session missing"));
        assert!(Arc::ptr_eq(&session, &unchanged));
    }

    #[tokio::test]
    async fn two_step_verification_is_a_distinct_client_error() {
        let factory = Arc::new(MockFactory::new());
        let backend = Arc::new(MockBackend::new());
        backend.require_two_step();
        factory.insert("+15550001", backend);
        let (flow, _registry) = flow_with(factory);

        assert!(matches!(
            flow.begin_login("+15550001", BASE).await,
            Err(Error::TwoStepRequired)
        ));
    }

    #[tokio::test]
    async fn malformed_phone_is_a_distinct_client_error() {
        let factory = Arc::new(MockFactory::new());
        factory.mark_invalid("not-a-phone");
        let (flow, _registry) = flow_with(factory);

        assert!(matches!(
            flow.begin_login("not-a-phone", BASE).await,
            Err(Error::PhoneInvalid(_))
        ));
    }

    #[tokio::test]
    async fn check_authorization_unknown_account_is_not_found() {
        let factory = Arc::new(MockFactory::new());
        let (flow, _registry) = flow_with(factory);

        assert!(matches!(
            flow.check_authorization("+15550001").await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn background_wait_authorizes_the_session() {
        let factory = Arc::new(MockFactory::new());
        let backend = Arc::new(MockBackend::new());
        backend.authorize_after(Duration::from_millis(10));
        factory.insert("+15550001", Arc::clone(&backend));
        let (flow, registry) = flow_with(factory);

        flow.begin_login("+15550001", BASE)
            .await
            .unwrap_or_else(|e| panic!("login failed: {e}"));
        let polled = flow
            .check_authorization("+15550001")
            .await
            .unwrap_or_else(|e| panic!("check failed: {e}"));
        assert!(!polled, "not yet scanned");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let polled = flow
            .check_authorization("+15550001")
            .await
            .unwrap_or_else(|e| panic!("check failed: {e}"));
        assert!(polled);
        let session = registry
            .get("+15550001")
            .unwrap_or_else(|| panic!("session missing"));
        assert_eq!(session.auth_state(), AuthState::Authorized);
    }

    #[tokio::test]
    async fn challenge_rotates_on_every_render() {
        let factory = Arc::new(MockFactory::new());
        let backend = Arc::new(MockBackend::new());
        factory.insert("+15550001", Arc::clone(&backend));
        let (flow, _registry) = flow_with(factory);

        flow.begin_login("+15550001", BASE)
            .await
            .unwrap_or_else(|e| panic!("login failed: {e}"));

        let first = flow
            .challenge_png("+15550001")
            .await
            .unwrap_or_else(|e| panic!("challenge failed: {e}"));
        assert_eq!(backend.last_challenge().as_deref(), Some("tg://login?token=1"));

        let second = flow
            .challenge_png("+15550001")
            .await
            .unwrap_or_else(|e| panic!("challenge failed: {e}"));
        assert_eq!(backend.last_challenge().as_deref(), Some("tg://login?token=2"));

        // Both are real images, and the rotated token renders differently.
        assert!(image::load_from_memory(&first).is_ok());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn challenge_for_unknown_account_is_not_found() {
        let factory = Arc::new(MockFactory::new());
        let (flow, _registry) = flow_with(factory);

        assert!(matches!(
            flow.challenge_png("+15550001").await,
            Err(Error::SessionNotFound(_))
        ));
    }
}
