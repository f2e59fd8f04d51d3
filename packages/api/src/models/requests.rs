//! Request and response bodies shared by the server routes and the client.

use serde::{Deserialize, Serialize};

use crate::providers::{ProviderKey, ProviderSpec};

/// Body of `POST /api/auth/authorize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorizeRequest {
    /// Scopes are resolved by the server from the provider roster.
    pub provider: ProviderKey,
    /// Where the callback should send the browser once the flow completes.
    #[serde(default)]
    pub next: Option<String>,
}

/// Response of `POST /api/auth/authorize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorizeResponse {
    pub url: String,
}

/// Email + password pair for credential sign-in and sign-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Result of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegisterResponse {
    /// The account was confirmed immediately and a session is active.
    SignedIn { user: super::UserInfo },
    /// A confirmation link was sent; it completes through the auth callback.
    ConfirmationSent { email: String },
}

/// One entry of the provider roster, as served by `GET /api/providers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderInfo {
    pub key: ProviderKey,
    pub name: String,
    pub description: String,
}

impl From<&ProviderSpec> for ProviderInfo {
    fn from(spec: &ProviderSpec) -> Self {
        Self {
            key: spec.key,
            name: spec.name.to_string(),
            description: spec.description.to_string(),
        }
    }
}
