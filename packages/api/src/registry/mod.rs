//! # Provider account registry
//!
//! Durable mapping of `(user, provider key) → ProviderAccount`. All access goes
//! through [`ProviderAccountRegistry`], which fronts a [`ProviderAccountStore`]:
//!
//! - [`PgProviderAccountStore`]: the `provider_accounts` table in Postgres. The
//!   unique index on `(user_id, provider)` plus `ON CONFLICT DO UPDATE` makes an
//!   upsert a single atomic statement, so two callbacks racing for the same
//!   user and provider still leave one row.
//! - [`MemoryProviderAccountStore`]: a locked vector for tests and local runs.
//!   It performs the same check-and-set under its lock and asserts the
//!   uniqueness invariant after every mutation.
//!
//! ## Operations
//!
//! | Method | Semantics |
//! |--------|-----------|
//! | [`upsert_link`](ProviderAccountRegistry::upsert_link) | Create or overwrite token + scopes for `(user, provider)`. Idempotent. |
//! | [`list_for_user`](ProviderAccountRegistry::list_for_user) | All links of a user, oldest first. Empty when none. |
//! | [`unlink`](ProviderAccountRegistry::unlink) | Delete by id. Deleting a missing id succeeds. |
//! | [`unlink_for_user`](ProviderAccountRegistry::unlink_for_user) | Same, restricted to rows owned by the user. |
//! | [`update_scopes`](ProviderAccountRegistry::update_scopes) | Replace the granted scopes of an existing link. |

mod memory;
mod postgres;

pub use memory::MemoryProviderAccountStore;
pub use postgres::PgProviderAccountStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ProviderAccount;
use crate::providers::ProviderKey;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// More than one row for the same user and provider. Never expected at
    /// runtime; the store enforces uniqueness.
    #[error("duplicate link for user {user_id} and provider {provider}")]
    DuplicateLink { user_id: Uuid, provider: ProviderKey },

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Fields written by an upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub user_id: Uuid,
    pub provider: ProviderKey,
    pub access_token: Option<String>,
    pub scopes: Vec<String>,
}

/// Storage backend for provider accounts.
#[async_trait]
pub trait ProviderAccountStore: Send + Sync {
    /// Insert, or overwrite token and scopes of the existing `(user, provider)` row.
    async fn upsert(&self, link: NewLink) -> Result<ProviderAccount, RegistryError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ProviderAccount>, RegistryError>;

    /// Delete a row, optionally only if `owner` owns it. Returns whether a row
    /// was removed.
    async fn delete(&self, account_id: Uuid, owner: Option<Uuid>) -> Result<bool, RegistryError>;

    async fn update_scopes(
        &self,
        account_id: Uuid,
        scopes: Vec<String>,
    ) -> Result<Option<ProviderAccount>, RegistryError>;
}

/// Registry of connected provider accounts.
#[derive(Clone)]
pub struct ProviderAccountRegistry {
    store: Arc<dyn ProviderAccountStore>,
}

impl ProviderAccountRegistry {
    pub fn new(store: impl ProviderAccountStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Link `provider` to `user_id`, replacing any previous link's token and
    /// scopes.
    pub async fn upsert_link(
        &self,
        user_id: Uuid,
        provider: ProviderKey,
        access_token: &str,
        scopes: Vec<String>,
    ) -> Result<ProviderAccount, RegistryError> {
        let account = self
            .store
            .upsert(NewLink {
                user_id,
                provider,
                access_token: Some(access_token.to_string()),
                scopes,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            provider = %provider,
            account_id = %account.id,
            "Linked provider account"
        );
        Ok(account)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ProviderAccount>, RegistryError> {
        self.store.list_for_user(user_id).await
    }

    pub async fn unlink(&self, account_id: Uuid) -> Result<(), RegistryError> {
        let removed = self.store.delete(account_id, None).await?;
        log_unlink(account_id, removed);
        Ok(())
    }

    pub async fn unlink_for_user(&self, user_id: Uuid, account_id: Uuid) -> Result<(), RegistryError> {
        let removed = self.store.delete(account_id, Some(user_id)).await?;
        log_unlink(account_id, removed);
        Ok(())
    }

    /// Record the scopes a provider actually granted for an existing link.
    pub async fn update_scopes(
        &self,
        account_id: Uuid,
        scopes: Vec<String>,
    ) -> Result<Option<ProviderAccount>, RegistryError> {
        self.store.update_scopes(account_id, scopes).await
    }
}

fn log_unlink(account_id: Uuid, removed: bool) {
    if removed {
        tracing::info!(account_id = %account_id, "Unlinked provider account");
    } else {
        tracing::debug!(account_id = %account_id, "Unlink of missing provider account ignored");
    }
}
