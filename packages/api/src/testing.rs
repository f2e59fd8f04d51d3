//! Test doubles shared by the server-side unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;
use tower_sessions::{MemoryStore, Session};
use uuid::Uuid;

use crate::auth::{
    AuthConfig, AuthError, AuthService, AuthSession, OAuthRequest, SessionStore, SignUpResponse,
    FLOW_PARAM,
};
use crate::models::{AppMetadata, AuthUser, ProviderAccount};
use crate::registry::{NewLink, ProviderAccountStore, RegistryError};

pub const USER_ID: &str = "6f1c1b0e-8f5e-4a43-9a43-55b0c2a9a001";

/// In-process stand-in for the hosted auth service.
///
/// `good-code` exchanges into a Facebook OAuth session, `plain-code` into an
/// email session; any other code is rejected. `hunter22` is the only valid
/// password.
#[derive(Clone)]
pub struct FakeAuthService {
    pub expires_in: i64,
    pub confirm_sign_ups: bool,
    pub signed_out: Arc<Mutex<Vec<String>>>,
    /// `redirect_to` of every sign-up, i.e. the confirmation callback.
    pub sign_up_redirects: Arc<Mutex<Vec<Url>>>,
}

impl Default for FakeAuthService {
    fn default() -> Self {
        Self {
            expires_in: 3600,
            confirm_sign_ups: false,
            signed_out: Arc::default(),
            sign_up_redirects: Arc::default(),
        }
    }
}

impl FakeAuthService {
    fn user(email: &str, provider: &str) -> AuthUser {
        AuthUser {
            id: Uuid::parse_str(USER_ID).unwrap(),
            email: Some(email.to_string()),
            app_metadata: AppMetadata {
                provider: Some(provider.to_string()),
                providers: vec![provider.to_string()],
            },
        }
    }

    fn session(&self, user: AuthUser) -> AuthSession {
        AuthSession {
            access_token: "access-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            expires_in: self.expires_in,
            expires_at: None,
            user,
        }
    }

    fn rejected(message: &str) -> AuthError {
        AuthError::Rejected {
            status: 400,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl AuthService for FakeAuthService {
    fn authorize_url(&self, request: &OAuthRequest<'_>) -> Result<Url, AuthError> {
        let mut url = Url::parse("https://auth.test/auth/v1/authorize").unwrap();
        url.query_pairs_mut()
            .append_pair("provider", request.provider)
            .append_pair("scopes", request.scopes)
            .append_pair("redirect_to", request.redirect_to.as_str())
            .append_pair("code_challenge", request.code_challenge);
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthError> {
        if code_verifier.is_empty() {
            return Err(Self::rejected("missing code verifier"));
        }
        match code {
            "good-code" => Ok(self.session(Self::user("ada@example.com", "facebook"))),
            "plain-code" => Ok(self.session(Self::user("ada@example.com", "email"))),
            _ => Err(Self::rejected("invalid flow state")),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        if password != "hunter22" {
            return Err(Self::rejected("Invalid login credentials"));
        }
        Ok(self.session(Self::user(email, "email")))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _code_challenge: &str,
        redirect_to: &Url,
    ) -> Result<SignUpResponse, AuthError> {
        self.sign_up_redirects
            .lock()
            .unwrap()
            .push(redirect_to.clone());
        let user = Self::user(email, "email");
        if self.confirm_sign_ups {
            Ok(SignUpResponse::Unconfirmed(user))
        } else {
            Ok(SignUpResponse::Session(self.session(user)))
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.signed_out.lock().unwrap().push(access_token.to_string());
        Ok(())
    }
}

/// A store whose every call fails, as if the database were down.
pub struct FailingAccountStore;

#[async_trait]
impl ProviderAccountStore for FailingAccountStore {
    async fn upsert(&self, _link: NewLink) -> Result<ProviderAccount, RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }

    async fn list_for_user(&self, _user_id: Uuid) -> Result<Vec<ProviderAccount>, RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }

    async fn delete(&self, _account_id: Uuid, _owner: Option<Uuid>) -> Result<bool, RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }

    async fn update_scopes(
        &self,
        _account_id: Uuid,
        _scopes: Vec<String>,
    ) -> Result<Option<ProviderAccount>, RegistryError> {
        Err(RegistryError::Unavailable("store offline".to_string()))
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::new("https://auth.test", "anon-key", "http://localhost:8080").unwrap()
}

/// A session store over a detached in-memory session.
pub fn session_store(auth: FakeAuthService) -> (SessionStore, Session) {
    let session = Session::new(None, Arc::new(MemoryStore::default()), None);
    let store = SessionStore::new(session.clone(), Arc::new(auth), Arc::new(auth_config()));
    (store, session)
}

fn query_param(url: &Url, name: &str) -> String {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

/// The `flow` id a callback URL carries.
pub fn callback_flow(callback: &Url) -> String {
    query_param(callback, FLOW_PARAM)
}

/// The callback URL embedded in an authorize URL.
pub fn redirect_of(authorize: &Url) -> Url {
    Url::parse(&query_param(authorize, "redirect_to")).unwrap()
}

/// The `flow` id of the callback an authorize URL leads back to.
pub fn flow_of(authorize: &Url) -> String {
    callback_flow(&redirect_of(authorize))
}
