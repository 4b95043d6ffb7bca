//! Scriptable in-memory backend used by tests in dependent crates.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {anyhow::anyhow, async_trait::async_trait};

use tgrelay_common::{Error, Result};

use crate::{
    adapter::{BackendFactory, MessagingBackend},
    types::{HistoryEntry, PeerId, Sender},
};

/// Record of one `send_file` call.
#[derive(Debug, Clone)]
pub struct SentFile {
    pub path: PathBuf,
    /// Whether the file was present on disk at the moment of the call.
    pub existed_at_send: bool,
}

/// In-memory [`MessagingBackend`] whose behavior is scripted per test.
#[derive(Default)]
pub struct MockBackend {
    authorized: AtomicBool,
    two_step: AtomicBool,
    fail_sends: AtomicBool,
    fail_logout: AtomicBool,
    authorize_after: Mutex<Option<Duration>>,
    challenge_counter: AtomicUsize,
    last_challenge: Mutex<Option<String>>,
    peers: Mutex<HashMap<String, PeerId>>,
    senders: Mutex<HashMap<String, Sender>>,
    history: Mutex<Vec<HistoryEntry>>,
    sent_texts: Mutex<Vec<(PeerId, String)>>,
    sent_files: Mutex<Vec<SentFile>>,
    connects: AtomicUsize,
    logouts: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    /// Make `connect` fail with the two-step-verification client error.
    pub fn require_two_step(&self) {
        self.two_step.store(true, Ordering::SeqCst);
    }

    /// Make the background authorization wait succeed after `delay`.
    /// Without this, the wait stays pending forever.
    pub fn authorize_after(&self, delay: Duration) {
        *self.authorize_after.lock().unwrap() = Some(delay);
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn fail_logout(&self) {
        self.fail_logout.store(true, Ordering::SeqCst);
    }

    pub fn add_peer(&self, name: &str, peer: &str) {
        self.peers
            .lock()
            .unwrap()
            .insert(name.to_string(), PeerId(peer.to_string()));
    }

    pub fn add_sender(&self, sender_id: &str, sender: Sender) {
        self.senders
            .lock()
            .unwrap()
            .insert(sender_id.to_string(), sender);
    }

    pub fn set_history(&self, entries: Vec<HistoryEntry>) {
        *self.history.lock().unwrap() = entries;
    }

    pub fn last_challenge(&self) -> Option<String> {
        self.last_challenge.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<(PeerId, String)> {
        self.sent_texts.lock().unwrap().clone()
    }

    pub fn sent_files(&self) -> Vec<SentFile> {
        self.sent_files.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingBackend for MockBackend {
    async fn connect(&self) -> Result<()> {
        if self.two_step.load(Ordering::SeqCst) {
            return Err(Error::TwoStepRequired);
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn request_authorization(&self) -> Result<()> {
        let delay = *self.authorize_after.lock().unwrap();
        match delay {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                self.authorized.store(true, Ordering::SeqCst);
                Ok(())
            },
            None => {
                std::future::pending::<()>().await;
                Ok(())
            },
        }
    }

    async fn is_authorized(&self) -> Result<bool> {
        Ok(self.authorized.load(Ordering::SeqCst))
    }

    async fn qr_challenge(&self) -> Result<String> {
        let token = self.challenge_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let url = format!("tg://login?token={token}");
        *self.last_challenge.lock().unwrap() = Some(url.clone());
        Ok(url)
    }

    async fn resolve_peer(&self, name: &str) -> Result<PeerId> {
        self.peers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PeerInvalid(name.to_string()))
    }

    async fn fetch_history(&self, _peer: &PeerId, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.history.lock().unwrap().clone();
        entries.truncate(limit);
        Ok(entries)
    }

    async fn resolve_sender(&self, sender_id: &str) -> Result<Sender> {
        self.senders
            .lock()
            .unwrap()
            .get(sender_id)
            .cloned()
            .ok_or_else(|| Error::PeerInvalid(sender_id.to_string()))
    }

    async fn send_text(&self, peer: &PeerId, text: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::unexpected(anyhow!("scripted send failure")));
        }
        self.sent_texts
            .lock()
            .unwrap()
            .push((peer.clone(), text.to_string()));
        Ok(())
    }

    async fn send_file(&self, _peer: &PeerId, path: &Path) -> Result<()> {
        self.sent_files.lock().unwrap().push(SentFile {
            path: path.to_path_buf(),
            existed_at_send: path.exists(),
        });
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::unexpected(anyhow!("scripted send failure")));
        }
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(Error::unexpected(anyhow!("scripted logout failure")));
        }
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out [`MockBackend`] instances, one per account, counting
/// constructions.
#[derive(Default)]
pub struct MockFactory {
    backends: Mutex<HashMap<String, Arc<MockBackend>>>,
    invalid_phones: Mutex<HashSet<String>>,
    created: AtomicUsize,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a scripted backend for an account. Without this,
    /// `create` hands out a fresh default backend.
    pub fn insert(&self, account_id: &str, backend: Arc<MockBackend>) {
        self.backends
            .lock()
            .unwrap()
            .insert(account_id.to_string(), backend);
    }

    /// Make `create` reject this account with the invalid-phone error.
    pub fn mark_invalid(&self, account_id: &str) {
        self.invalid_phones
            .lock()
            .unwrap()
            .insert(account_id.to_string());
    }

    /// Number of backend handles constructed so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// The backend currently registered for an account, if any.
    pub fn backend(&self, account_id: &str) -> Option<Arc<MockBackend>> {
        self.backends.lock().unwrap().get(account_id).cloned()
    }
}

#[async_trait]
impl BackendFactory for MockFactory {
    async fn create(&self, account_id: &str) -> Result<Arc<dyn MessagingBackend>> {
        if self.invalid_phones.lock().unwrap().contains(account_id) {
            return Err(Error::PhoneInvalid(account_id.to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let backend = self
            .backends
            .lock()
            .unwrap()
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(MockBackend::new()))
            .clone();
        Ok(backend)
    }
}
