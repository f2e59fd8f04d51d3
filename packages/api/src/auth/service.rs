//! # Hosted auth service interface
//!
//! Everything identity-related is delegated to an external auth service. The
//! [`AuthService`] trait is the seam: the production implementation is
//! [`GoTrueClient`](super::GoTrueClient), tests plug in an in-process fake.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`authorize_url`](AuthService::authorize_url) | Build the URL that starts an OAuth sign-in at the service. No I/O. |
//! | [`exchange_code`](AuthService::exchange_code) | Trade an authorization code + PKCE verifier for a session. |
//! | [`sign_in_with_password`](AuthService::sign_in_with_password) | Credential sign-in. |
//! | [`sign_up`](AuthService::sign_up) | Create an email + password account. |
//! | [`sign_out`](AuthService::sign_out) | Revoke the session's tokens at the service. |

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::AuthUser;

/// Parameters of an OAuth sign-in.
#[derive(Debug, Clone)]
pub struct OAuthRequest<'a> {
    /// OAuth provider name as the service knows it (`facebook`, `google`, ...).
    pub provider: &'a str,
    pub scopes: &'a str,
    pub redirect_to: &'a Url,
    /// PKCE S256 challenge.
    pub code_challenge: &'a str,
}

/// Tokens and user returned by a successful exchange or sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Absolute expiry, unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Absolute expiry, derived from `expires_in` when the service omits it.
    pub fn expiry(&self, now: i64) -> i64 {
        self.expires_at
            .unwrap_or_else(|| now.saturating_add(self.expires_in))
    }
}

/// Outcome of a sign-up: either an immediate session or a pending confirmation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSession),
    Unconfirmed(AuthUser),
}

#[async_trait]
pub trait AuthService: Send + Sync {
    fn authorize_url(&self, request: &OAuthRequest<'_>) -> Result<Url, AuthError>;

    async fn exchange_code(&self, code: &str, code_verifier: &str)
        -> Result<AuthSession, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        code_challenge: &str,
        redirect_to: &Url,
    ) -> Result<SignUpResponse, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}
