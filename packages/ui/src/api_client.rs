//! HTTP client for the accounts and auth endpoints.

use api::models::{AuthorizeRequest, AuthorizeResponse};
use api::ProviderAccountInfo;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server url: {0}")]
    Url(String),

    #[error("{code}: {message} (HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

impl ClientError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }
}

/// Server calls the connection controller depends on.
#[async_trait]
pub trait AccountsApi: Send + Sync {
    /// `GET /api/accounts`
    async fn list_accounts(&self) -> Result<Vec<ProviderAccountInfo>, ClientError>;

    /// `POST /api/auth/authorize`
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizeResponse, ClientError>;

    /// `DELETE /api/accounts/{id}`
    async fn unlink(&self, account_id: &str) -> Result<(), ClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// [`AccountsApi`] over HTTP, keeping the session cookie between calls.
#[derive(Clone)]
pub struct HttpAccountsApi {
    base_url: Url,
    http: Client,
}

impl HttpAccountsApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::Url(e.to_string()))?;
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self { base_url, http })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Url(e.to_string()))
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => (err.code, err.message),
        Err(_) => ("UNKNOWN".to_string(), body),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json().await?)
}

#[async_trait]
impl AccountsApi for HttpAccountsApi {
    async fn list_accounts(&self) -> Result<Vec<ProviderAccountInfo>, ClientError> {
        let response = self.http.get(self.endpoint("/api/accounts")?).send().await?;
        json(response).await
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizeResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/api/auth/authorize")?)
            .json(request)
            .send()
            .await?;
        json(response).await
    }

    async fn unlink(&self, account_id: &str) -> Result<(), ClientError> {
        let path = format!("/api/accounts/{}", account_id);
        let response = self.http.delete(self.endpoint(&path)?).send().await?;
        check(response).await.map(|_| ())
    }
}
