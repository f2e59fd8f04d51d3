//! # Request-scoped authentication state
//!
//! [`SessionStore`] sits between a request's `tower_sessions::Session` (the
//! cookie-bound record) and the hosted [`AuthService`]. Handlers build one per
//! request and never touch session keys directly.
//!
//! ## Session keys
//!
//! | Key | Type | Lifetime |
//! |-----|------|----------|
//! | [`PENDING_AUTH_KEY`] | `Vec<PendingAuth>` | From starting a PKCE flow until its callback. |
//! | [`SESSION_KEY`] | [`SessionData`] | From sign-in until sign-out or expiry. |
//!
//! ## Concurrent flows
//!
//! One browser can start several flows before any of them returns, e.g. a
//! connect per tab. Each flow gets its own id, carried in the callback URL's
//! `flow` parameter, and a callback only consumes the entry with that id. At
//! most [`MAX_PENDING_FLOWS`] are kept; starting another drops the oldest.
//!
//! ## Cookie atomicity
//!
//! Every write is awaited before the handler returns its response. The session
//! layer then persists the record and attaches the `Set-Cookie` header to that
//! same response, so a redirect never leaves with only part of the session
//! written.

use std::sync::Arc;

use oauth2::PkceCodeChallenge;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use super::config::AuthConfig;
use super::service::{AuthService, AuthSession, OAuthRequest, SignUpResponse};
use super::AuthError;
use crate::models::{AuthUser, RegisterResponse, UserInfo};
use crate::providers::ProviderKey;

/// Key for the established session.
pub const SESSION_KEY: &str = "auth.session";

/// Key for the PKCE verifiers of in-flight sign-ins.
pub const PENDING_AUTH_KEY: &str = "auth.pending";

pub const MAX_PENDING_FLOWS: usize = 8;

/// Session data stored in the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// OAuth provider used to establish the session, if any.
    pub oauth_provider: Option<String>,
    /// Unix seconds.
    pub expires_at: i64,
}

impl SessionData {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// State kept between starting a PKCE flow and its callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAuth {
    /// Matches the `flow` parameter of the callback URL.
    pub flow_id: String,
    pub code_verifier: String,
    /// Provider being connected; `None` for credential sign-up confirmation.
    pub provider: Option<ProviderKey>,
}

/// A session freshly established by a code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct EstablishedSession {
    pub user: AuthUser,
    pub access_token: String,
    pub oauth_provider: Option<String>,
    /// Application provider key the flow was started for, if known.
    pub provider: Option<ProviderKey>,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Request-scoped view of the authentication session.
pub struct SessionStore {
    session: Session,
    auth: Arc<dyn AuthService>,
    config: Arc<AuthConfig>,
}

impl SessionStore {
    pub fn new(session: Session, auth: Arc<dyn AuthService>, config: Arc<AuthConfig>) -> Self {
        Self {
            session,
            auth,
            config,
        }
    }

    /// Start an OAuth sign-in for `provider`; returns the URL to send the
    /// browser to.
    pub async fn begin_oauth(
        &self,
        provider: ProviderKey,
        scopes: &str,
        next: &str,
    ) -> Result<Url, AuthError> {
        let (flow_id, code_challenge) = self.stash_pending(Some(provider)).await?;
        let redirect_to = self.config.callback_url(next, &flow_id)?;

        self.auth.authorize_url(&OAuthRequest {
            provider: provider.oauth_provider(),
            scopes,
            redirect_to: &redirect_to,
            code_challenge: &code_challenge,
        })
    }

    /// Trade an authorization code for a session and store it. `flow_id`
    /// selects the pending flow the code belongs to; other flows are kept.
    pub async fn exchange_code(
        &self,
        code: &str,
        flow_id: Option<&str>,
    ) -> Result<EstablishedSession, AuthError> {
        let pending = match flow_id {
            Some(flow_id) => self.take_pending(flow_id).await?,
            None => None,
        }
        .ok_or(AuthError::MissingVerifier)?;

        let auth_session = self
            .auth
            .exchange_code(code, &pending.code_verifier)
            .await?;

        let oauth_provider = match pending.provider {
            Some(provider) => Some(provider.oauth_provider().to_string()),
            None => auth_session.user.oauth_provider().map(str::to_string),
        };

        let data = self.establish(auth_session, oauth_provider).await?;

        Ok(EstablishedSession {
            user: data.user,
            access_token: data.access_token,
            oauth_provider: data.oauth_provider,
            provider: pending.provider,
        })
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserInfo, AuthError> {
        let auth_session = self.auth.sign_in_with_password(email, password).await?;
        let data = self.establish(auth_session, None).await?;
        Ok(data.user.to_info())
    }

    /// Create an account. When the service requires email confirmation the
    /// PKCE verifier stays in the session for the confirmation callback.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<RegisterResponse, AuthError> {
        let (flow_id, code_challenge) = self.stash_pending(None).await?;
        let redirect_to = self.config.callback_url("/", &flow_id)?;

        match self
            .auth
            .sign_up(email, password, &code_challenge, &redirect_to)
            .await?
        {
            SignUpResponse::Session(auth_session) => {
                self.take_pending(&flow_id).await?;
                let data = self.establish(auth_session, None).await?;
                Ok(RegisterResponse::SignedIn {
                    user: data.user.to_info(),
                })
            }
            SignUpResponse::Unconfirmed(user) => Ok(RegisterResponse::ConfirmationSent {
                email: user.email.unwrap_or_else(|| email.to_string()),
            }),
        }
    }

    /// The signed-in user, or `None` when there is no live session.
    pub async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
        let data: Option<SessionData> = self.session.get(SESSION_KEY).await?;

        match data {
            Some(data) if data.is_expired(now()) => {
                self.session.remove::<SessionData>(SESSION_KEY).await?;
                Ok(None)
            }
            Some(data) => Ok(Some(data.user)),
            None => Ok(None),
        }
    }

    /// Revoke the session at the auth service and clear it locally.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let data: Option<SessionData> = self.session.get(SESSION_KEY).await?;

        if let Some(data) = data {
            if let Err(e) = self.auth.sign_out(&data.access_token).await {
                tracing::warn!("Failed to revoke session at auth service: {}", e);
            }
        }

        self.session.flush().await?;
        Ok(())
    }

    async fn pending_flows(&self) -> Result<Vec<PendingAuth>, AuthError> {
        Ok(self
            .session
            .get::<Vec<PendingAuth>>(PENDING_AUTH_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Record a new flow; returns its id and PKCE challenge.
    async fn stash_pending(
        &self,
        provider: Option<ProviderKey>,
    ) -> Result<(String, String), AuthError> {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let flow_id = Uuid::new_v4().simple().to_string();

        let mut flows = self.pending_flows().await?;
        flows.push(PendingAuth {
            flow_id: flow_id.clone(),
            code_verifier: verifier.secret().clone(),
            provider,
        });
        if flows.len() > MAX_PENDING_FLOWS {
            let excess = flows.len() - MAX_PENDING_FLOWS;
            flows.drain(..excess);
        }
        self.session.insert(PENDING_AUTH_KEY, flows).await?;

        Ok((flow_id, challenge.as_str().to_string()))
    }

    /// Remove and return the flow with `flow_id`, leaving the others.
    async fn take_pending(&self, flow_id: &str) -> Result<Option<PendingAuth>, AuthError> {
        let mut flows = self.pending_flows().await?;
        let Some(index) = flows.iter().position(|f| f.flow_id == flow_id) else {
            return Ok(None);
        };
        let pending = flows.remove(index);

        if flows.is_empty() {
            self.session
                .remove::<Vec<PendingAuth>>(PENDING_AUTH_KEY)
                .await?;
        } else {
            self.session.insert(PENDING_AUTH_KEY, flows).await?;
        }
        Ok(Some(pending))
    }

    async fn establish(
        &self,
        auth_session: AuthSession,
        oauth_provider: Option<String>,
    ) -> Result<SessionData, AuthError> {
        let data = SessionData {
            expires_at: auth_session.expiry(now()),
            user: auth_session.user,
            access_token: auth_session.access_token,
            refresh_token: auth_session.refresh_token,
            oauth_provider,
        };

        // New identity, new session id.
        self.session.cycle_id().await?;
        self.session.insert(SESSION_KEY, data.clone()).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{callback_flow, flow_of, session_store, FakeAuthService, USER_ID};

    async fn pending(session: &Session) -> Vec<PendingAuth> {
        session
            .get::<Vec<PendingAuth>>(PENDING_AUTH_KEY)
            .await
            .unwrap()
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_exchange_without_pending_flow_fails() {
        let (store, _session) = session_store(FakeAuthService::default());

        for flow in [None, Some("unknown-flow")] {
            let err = store.exchange_code("good-code", flow).await.unwrap_err();
            assert!(matches!(err, AuthError::MissingVerifier));
        }
        assert!(store.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exchange_establishes_session() {
        let (store, session) = session_store(FakeAuthService::default());

        let url = store
            .begin_oauth(ProviderKey::Instagram, ProviderKey::Instagram.scopes(), "/social")
            .await
            .unwrap();
        assert!(url.as_str().contains("provider=facebook"));

        let flow = flow_of(&url);
        let established = store.exchange_code("good-code", Some(&flow)).await.unwrap();
        assert_eq!(established.provider, Some(ProviderKey::Instagram));
        assert_eq!(established.oauth_provider.as_deref(), Some("facebook"));

        let user = store.current_user().await.unwrap().unwrap();
        assert_eq!(user.id.to_string(), USER_ID);
        assert!(pending(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_interleaved_flows_keep_their_own_verifier() {
        let (store, session) = session_store(FakeAuthService::default());

        let first = store
            .begin_oauth(ProviderKey::Instagram, "", "/social")
            .await
            .unwrap();
        let second = store
            .begin_oauth(ProviderKey::Twitter, "", "/social")
            .await
            .unwrap();
        assert_ne!(flow_of(&first), flow_of(&second));
        assert_eq!(pending(&session).await.len(), 2);

        let established = store
            .exchange_code("good-code", Some(&flow_of(&first)))
            .await
            .unwrap();
        assert_eq!(established.provider, Some(ProviderKey::Instagram));

        let remaining = pending(&session).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].provider, Some(ProviderKey::Twitter));

        let established = store
            .exchange_code("good-code", Some(&flow_of(&second)))
            .await
            .unwrap();
        assert_eq!(established.provider, Some(ProviderKey::Twitter));
        assert!(pending(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_pending_flows_are_bounded() {
        let (store, session) = session_store(FakeAuthService::default());

        let oldest = store.begin_oauth(ProviderKey::Youtube, "", "/").await.unwrap();
        for _ in 0..MAX_PENDING_FLOWS {
            store.begin_oauth(ProviderKey::Twitter, "", "/").await.unwrap();
        }

        assert_eq!(pending(&session).await.len(), MAX_PENDING_FLOWS);
        let err = store
            .exchange_code("good-code", Some(&flow_of(&oldest)))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingVerifier));
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_no_session() {
        let (store, _session) = session_store(FakeAuthService::default());

        let url = store
            .begin_oauth(ProviderKey::Twitter, "", "/")
            .await
            .unwrap();
        assert!(store
            .exchange_code("bad-code", Some(&flow_of(&url)))
            .await
            .is_err());
        assert!(store.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_reads_as_signed_out() {
        let auth = FakeAuthService {
            expires_in: -10,
            ..FakeAuthService::default()
        };
        let (store, _session) = session_store(auth);

        store.sign_in_with_password("ada@example.com", "hunter22").await.unwrap();
        assert!(store.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let auth = FakeAuthService::default();
        let signed_out = auth.signed_out.clone();
        let (store, _session) = session_store(auth);

        store.sign_in_with_password("ada@example.com", "hunter22").await.unwrap();
        assert!(store.current_user().await.unwrap().is_some());

        store.sign_out().await.unwrap();
        assert!(store.current_user().await.unwrap().is_none());
        assert_eq!(signed_out.lock().unwrap().as_slice(), ["access-token"]);
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation() {
        let auth = FakeAuthService {
            confirm_sign_ups: true,
            ..FakeAuthService::default()
        };
        let redirects = auth.sign_up_redirects.clone();
        let (store, session) = session_store(auth);

        let response = store.sign_up("new@example.com", "hunter22").await.unwrap();
        assert_eq!(
            response,
            RegisterResponse::ConfirmationSent {
                email: "new@example.com".to_string()
            }
        );
        let flows = pending(&session).await;
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].provider, None);

        let redirect = redirects.lock().unwrap()[0].clone();
        assert_eq!(callback_flow(&redirect), flows[0].flow_id);
        assert!(store.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_immediate_sign_up_clears_its_flow() {
        let (store, session) = session_store(FakeAuthService::default());

        let response = store.sign_up("new@example.com", "hunter22").await.unwrap();
        assert!(matches!(response, RegisterResponse::SignedIn { .. }));
        assert!(pending(&session).await.is_empty());
        assert!(store.current_user().await.unwrap().is_some());
    }
}
