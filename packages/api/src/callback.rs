//! # OAuth callback handling
//!
//! The identity provider sends the browser back to `/auth/callback` with an
//! optional `code`, the `next` destination chosen when the flow started and the
//! `flow` id of the pending sign-in it completes.
//! [`handle_callback`] resolves that into two independent results:
//!
//! - [`SignInOutcome`]: did the user end up with a session?
//! - [`LinkOutcome`]: was the provider account remembered?
//!
//! Only the first decides where the browser goes. A failed link is logged and
//! left for the next callback to retry (the upsert is idempotent), but it never
//! turns a successful sign-in into a failure.
//!
//! | Input | Redirect | Link |
//! |-------|----------|------|
//! | no `code` | `/login` | not attempted |
//! | exchange fails | `/login` | not attempted |
//! | session without OAuth provider | `next` | not attempted |
//! | OAuth session | `next` | upsert with empty scopes |

use crate::auth::{AuthError, EstablishedSession, SessionStore};
use crate::models::ProviderAccount;
use crate::providers::ProviderKey;
use crate::registry::{ProviderAccountRegistry, RegistryError};

/// Sign-in entry point.
pub const SIGN_IN_PATH: &str = "/login";

/// Destination when the callback carries no usable `next`.
pub const DEFAULT_NEXT: &str = "/";

#[derive(Debug)]
pub enum SignInOutcome {
    MissingCode,
    ExchangeFailed(AuthError),
    SignedIn(EstablishedSession),
}

#[derive(Debug)]
pub enum LinkOutcome {
    /// No OAuth provider on the session, or no session at all.
    NotAttempted,
    /// OAuth session whose provider maps to no provider key.
    Skipped { oauth_provider: String },
    Linked(ProviderAccount),
    Failed(RegistryError),
}

#[derive(Debug)]
pub struct CallbackResult {
    pub sign_in: SignInOutcome,
    pub link: LinkOutcome,
    /// Sanitised post-login destination.
    pub next: String,
}

impl CallbackResult {
    /// Where the browser is sent.
    pub fn redirect_target(&self) -> &str {
        match self.sign_in {
            SignInOutcome::SignedIn(_) => &self.next,
            _ => SIGN_IN_PATH,
        }
    }
}

/// Accept `next` only as a same-site absolute path.
pub fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && !next.starts_with("/\\")
                && !next.chars().any(char::is_control) =>
        {
            next.to_string()
        }
        _ => DEFAULT_NEXT.to_string(),
    }
}

pub async fn handle_callback(
    sessions: &SessionStore,
    registry: &ProviderAccountRegistry,
    code: Option<&str>,
    flow: Option<&str>,
    next: Option<&str>,
) -> CallbackResult {
    let next = sanitize_next(next);

    let sign_in = match code.filter(|c| !c.is_empty()) {
        None => SignInOutcome::MissingCode,
        Some(code) => match sessions.exchange_code(code, flow).await {
            Ok(session) => SignInOutcome::SignedIn(session),
            Err(e) => {
                tracing::warn!("Auth code exchange failed: {}", e);
                SignInOutcome::ExchangeFailed(e)
            }
        },
    };

    let link = match &sign_in {
        SignInOutcome::SignedIn(session) => link_provider(registry, session).await,
        _ => LinkOutcome::NotAttempted,
    };

    CallbackResult {
        sign_in,
        link,
        next,
    }
}

async fn link_provider(
    registry: &ProviderAccountRegistry,
    session: &EstablishedSession,
) -> LinkOutcome {
    let Some(oauth_provider) = session.oauth_provider.as_deref() else {
        return LinkOutcome::NotAttempted;
    };

    let Some(provider) = session
        .provider
        .or_else(|| ProviderKey::for_oauth_provider(oauth_provider))
    else {
        tracing::warn!(
            user_id = %session.user.id,
            "No provider key for OAuth provider {}, link skipped",
            oauth_provider
        );
        return LinkOutcome::Skipped {
            oauth_provider: oauth_provider.to_string(),
        };
    };

    // Granted scopes are not known yet; they are backfilled separately.
    match registry
        .upsert_link(session.user.id, provider, &session.access_token, Vec::new())
        .await
    {
        Ok(account) => LinkOutcome::Linked(account),
        Err(e) => {
            tracing::error!(
                user_id = %session.user.id,
                provider = %provider,
                "Error saving provider account: {}",
                e
            );
            LinkOutcome::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryProviderAccountStore;
    use crate::testing::{flow_of, session_store, FailingAccountStore, FakeAuthService, USER_ID};
    use uuid::Uuid;

    #[test]
    fn test_sanitize_next() {
        assert_eq!(sanitize_next(None), "/");
        assert_eq!(sanitize_next(Some("/social")), "/social");
        assert_eq!(sanitize_next(Some("/social?tab=1")), "/social?tab=1");
        assert_eq!(sanitize_next(Some("")), "/");
        assert_eq!(sanitize_next(Some("social")), "/");
        assert_eq!(sanitize_next(Some("//evil.example")), "/");
        assert_eq!(sanitize_next(Some("/\\evil.example")), "/");
        assert_eq!(sanitize_next(Some("https://evil.example")), "/");
        assert_eq!(sanitize_next(Some("/a\r\nSet-Cookie: x")), "/");
    }

    #[tokio::test]
    async fn test_missing_code_goes_to_sign_in() {
        let (sessions, _) = session_store(FakeAuthService::default());
        let registry = ProviderAccountRegistry::new(MemoryProviderAccountStore::new());

        for code in [None, Some("")] {
            let result = handle_callback(&sessions, &registry, code, None, Some("/social")).await;
            assert!(matches!(result.sign_in, SignInOutcome::MissingCode));
            assert!(matches!(result.link, LinkOutcome::NotAttempted));
            assert_eq!(result.redirect_target(), SIGN_IN_PATH);
        }
    }

    #[tokio::test]
    async fn test_failed_exchange_goes_to_sign_in() {
        let (sessions, _) = session_store(FakeAuthService::default());
        let registry = ProviderAccountRegistry::new(MemoryProviderAccountStore::new());
        let url = sessions
            .begin_oauth(ProviderKey::Twitter, "", "/social")
            .await
            .unwrap();

        let flow = flow_of(&url);
        let result = handle_callback(
            &sessions,
            &registry,
            Some("bad-code"),
            Some(&flow),
            Some("/social"),
        )
        .await;
        assert!(matches!(result.sign_in, SignInOutcome::ExchangeFailed(_)));
        assert_eq!(result.redirect_target(), SIGN_IN_PATH);
        let user = Uuid::parse_str(USER_ID).unwrap();
        assert!(registry.list_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oauth_session_links_requested_provider() {
        let (sessions, _) = session_store(FakeAuthService::default());
        let registry = ProviderAccountRegistry::new(MemoryProviderAccountStore::new());
        let url = sessions
            .begin_oauth(ProviderKey::Instagram, ProviderKey::Instagram.scopes(), "/social")
            .await
            .unwrap();

        let flow = flow_of(&url);
        let result = handle_callback(
            &sessions,
            &registry,
            Some("good-code"),
            Some(&flow),
            Some("/social"),
        )
        .await;
        assert_eq!(result.redirect_target(), "/social");
        match result.link {
            LinkOutcome::Linked(account) => {
                assert_eq!(account.provider, ProviderKey::Instagram);
                assert!(account.scopes.is_empty());
                assert_eq!(account.access_token.as_deref(), Some("access-token"));
            }
            other => panic!("unexpected link outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_registry_failure_keeps_sign_in() {
        let (sessions, _) = session_store(FakeAuthService::default());
        let registry = ProviderAccountRegistry::new(FailingAccountStore);
        let url = sessions
            .begin_oauth(ProviderKey::Facebook, "", "/social")
            .await
            .unwrap();

        let flow = flow_of(&url);
        let result = handle_callback(
            &sessions,
            &registry,
            Some("good-code"),
            Some(&flow),
            Some("/social"),
        )
        .await;
        assert!(matches!(result.sign_in, SignInOutcome::SignedIn(_)));
        assert!(matches!(result.link, LinkOutcome::Failed(_)));
        assert_eq!(result.redirect_target(), "/social");
        assert!(sessions.current_user().await.unwrap().is_some());
    }
}
