//! HTTP client for the messaging bridge daemon.
//!
//! The bridge owns the real client library and exposes one REST surface per
//! account:
//!
//! ```text
//! POST   /accounts                      register {account_id, app_id, app_secret, system_version}
//! POST   /accounts/{id}/connect
//! POST   /accounts/{id}/authorize/wait  long-polls until the account is authorized
//! GET    /accounts/{id}/authorized      -> {"authorized": bool}
//! POST   /accounts/{id}/qr              -> {"url": "<one-time login URL>"}
//! GET    /accounts/{id}/peers/{name}    -> {"peer": "<token>"}
//! GET    /accounts/{id}/history?peer=&limit=
//! GET    /accounts/{id}/senders/{sender_id}
//! POST   /accounts/{id}/messages        {peer, text}
//! POST   /accounts/{id}/files           {peer, path}
//! POST   /accounts/{id}/logout
//! DELETE /accounts/{id}
//! ```
//!
//! Failures carry `{"error": "<code>", "message": "<detail>"}`; the codes
//! `two_step_required`, `phone_invalid` and `peer_invalid` map onto the
//! client-error taxonomy, everything else surfaces as a generic backend
//! failure. Calls are attempted once.

use std::{path::Path, sync::Arc};

use {
    anyhow::anyhow,
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use tgrelay_common::{Error, Result};

use crate::{
    adapter::{BackendFactory, MessagingBackend},
    types::{HistoryEntry, PeerId, Sender},
};

/// Device identity reported to the backend when registering an account.
pub const DEFAULT_SYSTEM_VERSION: &str = "4.16.30-vxCUSTOM";

/// Connection settings for the bridge daemon.
#[derive(Clone)]
pub struct BridgeConfig {
    pub base_url: String,
    pub app_id: i32,
    pub app_secret: Secret<String>,
    pub system_version: String,
}

impl BridgeConfig {
    pub fn new(base_url: impl Into<String>, app_id: i32, app_secret: Secret<String>) -> Self {
        Self {
            base_url: base_url.into(),
            app_id,
            app_secret,
            system_version: DEFAULT_SYSTEM_VERSION.to_string(),
        }
    }
}

/// Creates [`BridgeBackend`] handles, registering each account with the
/// bridge on construction.
pub struct BridgeFactory {
    http: reqwest::Client,
    config: BridgeConfig,
}

impl BridgeFactory {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct RegisterAccount<'a> {
    account_id: &'a str,
    app_id: i32,
    app_secret: &'a str,
    system_version: &'a str,
}

#[async_trait]
impl BackendFactory for BridgeFactory {
    async fn create(&self, account_id: &str) -> Result<Arc<dyn MessagingBackend>> {
        let base = self.config.base_url.trim_end_matches('/').to_string();
        let body = RegisterAccount {
            account_id,
            app_id: self.config.app_id,
            app_secret: self.config.app_secret.expose_secret(),
            system_version: &self.config.system_version,
        };
        let response = self
            .http
            .post(format!("{base}/accounts"))
            .json(&body)
            .send()
            .await
            .map_err(Error::unexpected)?;
        check(response).await?;

        debug!(account_id, "registered account with bridge");
        Ok(Arc::new(BridgeBackend {
            http: self.http.clone(),
            base_url: base,
            account_id: account_id.to_string(),
        }))
    }
}

/// One account's handle onto the bridge.
pub struct BridgeBackend {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
}

impl BridgeBackend {
    fn account_url(&self, tail: &str) -> String {
        format!(
            "{}/accounts/{}{tail}",
            self.base_url,
            urlencoding::encode(&self.account_id)
        )
    }

    async fn post_empty(&self, tail: &str) -> Result<()> {
        let response = self
            .http
            .post(self.account_url(tail))
            .send()
            .await
            .map_err(Error::unexpected)?;
        check(response).await?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct BridgeErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct AuthorizedResponse {
    authorized: bool,
}

#[derive(Deserialize)]
struct QrResponse {
    url: String,
}

#[derive(Deserialize)]
struct PeerResponse {
    peer: PeerId,
}

#[derive(Deserialize)]
struct HistoryResponse {
    messages: Vec<HistoryEntry>,
}

#[derive(Serialize)]
struct SendTextRequest<'a> {
    peer: &'a PeerId,
    text: &'a str,
}

#[derive(Serialize)]
struct SendFileRequest<'a> {
    peer: &'a PeerId,
    path: String,
}

/// Map a non-success bridge response onto the error taxonomy.
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: BridgeErrorBody = response.json().await.unwrap_or_default();
    let detail = body
        .message
        .or_else(|| body.error.clone())
        .unwrap_or_else(|| status.to_string());

    Err(match body.error.as_deref() {
        Some("two_step_required") => Error::TwoStepRequired,
        Some("phone_invalid") => Error::PhoneInvalid(detail),
        Some("peer_invalid") => Error::PeerInvalid(detail),
        _ => Error::Backend(anyhow!("bridge returned {status}: {detail}")),
    })
}

#[async_trait]
impl MessagingBackend for BridgeBackend {
    async fn connect(&self) -> Result<()> {
        self.post_empty("/connect").await
    }

    async fn request_authorization(&self) -> Result<()> {
        self.post_empty("/authorize/wait").await
    }

    async fn is_authorized(&self) -> Result<bool> {
        let response = self
            .http
            .get(self.account_url("/authorized"))
            .send()
            .await
            .map_err(Error::unexpected)?;
        let body: AuthorizedResponse = check(response)
            .await?
            .json()
            .await
            .map_err(Error::unexpected)?;
        Ok(body.authorized)
    }

    async fn qr_challenge(&self) -> Result<String> {
        let response = self
            .http
            .post(self.account_url("/qr"))
            .send()
            .await
            .map_err(Error::unexpected)?;
        let body: QrResponse = check(response)
            .await?
            .json()
            .await
            .map_err(Error::unexpected)?;
        Ok(body.url)
    }

    async fn resolve_peer(&self, name: &str) -> Result<PeerId> {
        let url = self.account_url(&format!("/peers/{}", urlencoding::encode(name)));
        let response = self.http.get(url).send().await.map_err(Error::unexpected)?;
        let body: PeerResponse = check(response)
            .await?
            .json()
            .await
            .map_err(Error::unexpected)?;
        Ok(body.peer)
    }

    async fn fetch_history(&self, peer: &PeerId, limit: usize) -> Result<Vec<HistoryEntry>> {
        let response = self
            .http
            .get(self.account_url("/history"))
            .query(&[("peer", peer.as_str()), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(Error::unexpected)?;
        let body: HistoryResponse = check(response)
            .await?
            .json()
            .await
            .map_err(Error::unexpected)?;
        Ok(body.messages)
    }

    async fn resolve_sender(&self, sender_id: &str) -> Result<Sender> {
        let url = self.account_url(&format!("/senders/{}", urlencoding::encode(sender_id)));
        let response = self.http.get(url).send().await.map_err(Error::unexpected)?;
        check(response)
            .await?
            .json()
            .await
            .map_err(Error::unexpected)
    }

    async fn send_text(&self, peer: &PeerId, text: &str) -> Result<()> {
        let response = self
            .http
            .post(self.account_url("/messages"))
            .json(&SendTextRequest { peer, text })
            .send()
            .await
            .map_err(Error::unexpected)?;
        check(response).await?;
        debug!(account_id = %self.account_id, "text message sent");
        Ok(())
    }

    async fn send_file(&self, peer: &PeerId, path: &Path) -> Result<()> {
        let response = self
            .http
            .post(self.account_url("/files"))
            .json(&SendFileRequest {
                peer,
                path: path.display().to_string(),
            })
            .send()
            .await
            .map_err(Error::unexpected)?;
        check(response).await?;
        debug!(account_id = %self.account_id, "file sent");
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.post_empty("/logout").await
    }

    async fn disconnect(&self) -> Result<()> {
        let response = self
            .http
            .delete(self.account_url(""))
            .send()
            .await
            .map_err(Error::unexpected)?;
        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: String) -> BridgeConfig {
        BridgeConfig::new(base_url, 12345, Secret::new("hash".to_string()))
    }

    async fn backend_for(
        server: &mut mockito::ServerGuard,
        phone: &str,
    ) -> Arc<dyn MessagingBackend> {
        let register = server
            .mock("POST", "/accounts")
            .with_status(200)
            .create_async()
            .await;
        let factory = BridgeFactory::new(config(server.url()));
        let backend = factory
            .create(phone)
            .await
            .unwrap_or_else(|e| panic!("register failed: {e}"));
        register.assert_async().await;
        backend
    }

    #[tokio::test]
    async fn register_failure_maps_phone_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts")
            .with_status(400)
            .with_body(r#"{"error":"phone_invalid","message":"bad phone"}"#)
            .create_async()
            .await;

        let factory = BridgeFactory::new(config(server.url()));
        let err = match factory.create("not-a-phone").await {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, Error::PhoneInvalid(ref m) if m == "bad phone"));
    }

    #[tokio::test]
    async fn connect_surfaces_two_step_verification() {
        let mut server = mockito::Server::new_async().await;
        let backend = backend_for(&mut server, "+15550001").await;
        server
            .mock("POST", "/accounts/%2B15550001/connect")
            .with_status(400)
            .with_body(r#"{"error":"two_step_required"}"#)
            .create_async()
            .await;

        assert!(matches!(
            backend.connect().await,
            Err(Error::TwoStepRequired)
        ));
    }

    #[tokio::test]
    async fn qr_challenge_returns_login_url() {
        let mut server = mockito::Server::new_async().await;
        let backend = backend_for(&mut server, "+15550001").await;
        server
            .mock("POST", "/accounts/%2B15550001/qr")
            .with_status(200)
            .with_body(r#"{"url":"tg://login?token=abc123"}"#)
            .create_async()
            .await;

        let url = backend
            .qr_challenge()
            .await
            .unwrap_or_else(|e| panic!("qr failed: {e}"));
        assert_eq!(url, "tg://login?token=abc123");
    }

    #[tokio::test]
    async fn unknown_peer_maps_to_client_error() {
        let mut server = mockito::Server::new_async().await;
        let backend = backend_for(&mut server, "+15550001").await;
        server
            .mock("GET", "/accounts/%2B15550001/peers/%40nobody")
            .with_status(404)
            .with_body(r#"{"error":"peer_invalid","message":"no such username"}"#)
            .create_async()
            .await;

        let err = match backend.resolve_peer("@nobody").await {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.is_client());
    }

    #[tokio::test]
    async fn history_deserializes_entries() {
        let mut server = mockito::Server::new_async().await;
        let backend = backend_for(&mut server, "+15550001").await;
        server
            .mock("GET", "/accounts/%2B15550001/history")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("peer".into(), "peer-1".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"messages":[{"sender_id":"77","outgoing":false,"text":"hi"},
                               {"sender_id":null,"outgoing":true,"text":"hello"}]}"#,
            )
            .create_async()
            .await;

        let messages = backend
            .fetch_history(&PeerId("peer-1".into()), 50)
            .await
            .unwrap_or_else(|e| panic!("history failed: {e}"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_id.as_deref(), Some("77"));
        assert!(messages[1].outgoing);
    }

    #[tokio::test]
    async fn opaque_failures_keep_the_cause() {
        let mut server = mockito::Server::new_async().await;
        let backend = backend_for(&mut server, "+15550001").await;
        server
            .mock("POST", "/accounts/%2B15550001/messages")
            .with_status(500)
            .with_body(r#"{"error":"flood_wait","message":"wait 30 seconds"}"#)
            .create_async()
            .await;

        let err = match backend.send_text(&PeerId("peer-1".into()), "hi").await {
            Err(e) => e,
            Ok(()) => panic!("expected an error"),
        };
        assert!(!err.is_client());
        assert!(err.to_string().contains("wait 30 seconds"));
    }
}
