//! # Provider account model
//!
//! A [`ProviderAccount`] is the durable link between one user and one
//! integration from the provider roster. The `provider_accounts` table carries a
//! unique index on `(user_id, provider)`: a user has at most one row per
//! provider key, and a repeated link updates that row.
//!
//! [`ProviderAccountInfo`] is what the client sees. It never includes the access
//! token.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderKey;

#[cfg(feature = "server")]
use chrono::{DateTime, Utc};
#[cfg(feature = "server")]
use sqlx::FromRow;
#[cfg(feature = "server")]
use uuid::Uuid;

/// Full provider account record from the database.
#[cfg(feature = "server")]
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProviderAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub provider: ProviderKey,
    pub access_token: Option<String>,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "server")]
impl ProviderAccount {
    /// Convert to ProviderAccountInfo for client consumption.
    pub fn to_info(&self) -> ProviderAccountInfo {
        ProviderAccountInfo {
            id: self.id.to_string(),
            provider: self.provider,
            scopes: self.scopes.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

/// Connected account information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderAccountInfo {
    pub id: String,
    pub provider: ProviderKey,
    pub scopes: Vec<String>,
    pub created_at: String,
}
