//! Authentication errors.

use thiserror::Error;

/// Failure while talking to the hosted auth service or the session store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A code arrived but this session never started a PKCE flow.
    #[error("no pending sign-in for this session")]
    MissingVerifier,

    /// The auth service answered with a non-success status.
    #[error("auth service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("auth service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("invalid auth configuration: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether the caller supplied bad credentials or an unusable code, as
    /// opposed to an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        match self {
            AuthError::MissingVerifier => true,
            AuthError::Rejected { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}
