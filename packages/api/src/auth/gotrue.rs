//! # GoTrue REST client
//!
//! Implements [`AuthService`] against a GoTrue-compatible hosted auth service
//! (the API Supabase Auth exposes under `/auth/v1`). Only the PKCE flow is used:
//! this server never sees the identity provider's client secret, it only trades
//! the authorization code the service hands back for a session.
//!
//! ## Endpoints
//!
//! | Call | Request |
//! |------|---------|
//! | authorize | `GET /auth/v1/authorize?provider=..&redirect_to=..&scopes=..&code_challenge=..&code_challenge_method=s256` (browser navigation, URL only) |
//! | exchange | `POST /auth/v1/token?grant_type=pkce` with `{auth_code, code_verifier}` |
//! | password sign-in | `POST /auth/v1/token?grant_type=password` with `{email, password}` |
//! | sign-up | `POST /auth/v1/signup?redirect_to=..` with `{email, password, code_challenge, code_challenge_method}` |
//! | sign-out | `POST /auth/v1/logout` with the access token as bearer |
//!
//! Every request carries the `apikey` header. Non-2xx answers become
//! [`AuthError::Rejected`] with the service's message; connection failures become
//! [`AuthError::Transport`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::config::AuthConfig;
use super::service::{AuthService, AuthSession, OAuthRequest, SignUpResponse};
use super::AuthError;

const CODE_CHALLENGE_METHOD: &str = "s256";

/// Error body shapes the service uses across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| "no error message".to_string())
    }
}

/// Hosted auth service client.
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    config: AuthConfig,
    http: Client,
}

impl GoTrueClient {
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { config, http })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AuthError> {
        let response = request
            .header("apikey", &self.config.anon_key)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-2xx answer into [`AuthError::Rejected`].
async fn check(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    Err(AuthError::Rejected {
        status: status.as_u16(),
        message: body.into_message(),
    })
}

#[async_trait]
impl AuthService for GoTrueClient {
    fn authorize_url(&self, request: &OAuthRequest<'_>) -> Result<Url, AuthError> {
        let mut url = self.config.endpoint("authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("provider", request.provider)
                .append_pair("redirect_to", request.redirect_to.as_str());
            if !request.scopes.is_empty() {
                query.append_pair("scopes", request.scopes);
            }
            query
                .append_pair("code_challenge", request.code_challenge)
                .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);
        }
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthError> {
        let request = self
            .http
            .post(self.config.endpoint("token")?)
            .query(&[("grant_type", "pkce")])
            .json(&json!({ "auth_code": code, "code_verifier": code_verifier }));
        self.send(request).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let request = self
            .http
            .post(self.config.endpoint("token")?)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        self.send(request).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        code_challenge: &str,
        redirect_to: &Url,
    ) -> Result<SignUpResponse, AuthError> {
        let request = self
            .http
            .post(self.config.endpoint("signup")?)
            .query(&[("redirect_to", redirect_to.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "code_challenge": code_challenge,
                "code_challenge_method": CODE_CHALLENGE_METHOD,
            }));
        self.send(request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.config.endpoint("logout")?)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        check(response).await.map(|_| ())
    }
}
