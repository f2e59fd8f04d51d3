//! # User model for authenticated users
//!
//! Users are owned by the hosted auth service; this crate never creates or
//! deletes them, it only reads what the service returns.
//!
//! ## [`AuthUser`] (server only)
//!
//! The user object as returned by the hosted auth service's token and sign-up
//! endpoints:
//!
//! - `id`: the stable user id (`UUID`), used as the owner of every
//!   provider account row.
//! - `email`: optional; phone and some OAuth users have none.
//! - `app_metadata`: service-controlled metadata. `provider` is the provider
//!   the user first signed up with (`"email"` for password users).
//!
//! ## [`UserInfo`]
//!
//! A client-safe projection that can cross the server/client boundary. The
//! `Uuid` becomes a `String` so the type carries no server-only dependency.

use serde::{Deserialize, Serialize};

#[cfg(feature = "server")]
use uuid::Uuid;

/// Service-controlled user metadata.
#[cfg(feature = "server")]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub providers: Vec<String>,
}

/// User record issued by the hosted auth service.
#[cfg(feature = "server")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[cfg(feature = "server")]
impl AuthUser {
    /// OAuth provider the account was established with, if any.
    ///
    /// Credential-based accounts report `"email"` or `"phone"`, which are not
    /// OAuth providers.
    pub fn oauth_provider(&self) -> Option<&str> {
        self.app_metadata
            .provider
            .as_deref()
            .filter(|p| !matches!(*p, "email" | "phone"))
    }

    /// Convert to UserInfo for client consumption.
    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id.to_string(),
            email: self.email.clone(),
            provider: self.app_metadata.provider.clone(),
        }
    }
}

/// User information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub email: Option<String>,
    pub provider: Option<String>,
}
