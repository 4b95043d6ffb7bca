//! Shared error taxonomy for tgrelay.
//!
//! Every fallible operation in the workspace returns [`Result`]. The variants
//! map one-to-one onto the HTTP statuses the gateway emits: client errors
//! (bad phone, unknown peer, two-step verification) become 400, a missing
//! session becomes 404, and everything else surfaces as 500 with the cause
//! preserved verbatim.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The account has two-step verification enabled; QR login cannot
    /// complete it.
    #[error("two-step verification is enabled for this account")]
    TwoStepRequired,

    /// The phone identifier was rejected by the backend.
    #[error("invalid phone number: {0}")]
    PhoneInvalid(String),

    /// The counterpart username / handle / peer could not be resolved.
    #[error("unknown username or peer: {0}")]
    PeerInvalid(String),

    /// No live session is registered for the account.
    #[error("no session found for {0}")]
    SessionNotFound(String),

    /// The request itself was malformed (missing field, bad multipart body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other backend failure. Attempted once, never retried.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Error {
    /// Wrap an arbitrary failure as a backend error.
    pub fn unexpected(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }

    /// True for errors caused by bad caller input.
    pub fn is_client(&self) -> bool {
        matches!(
            self,
            Self::TwoStepRequired
                | Self::PhoneInvalid(_)
                | Self::PeerInvalid(_)
                | Self::InvalidRequest(_)
        )
    }
}
