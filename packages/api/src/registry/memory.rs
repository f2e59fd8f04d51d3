use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{NewLink, ProviderAccountStore, RegistryError};
use crate::models::ProviderAccount;

/// In-memory provider account store for testing and local runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryProviderAccountStore {
    accounts: Arc<Mutex<Vec<ProviderAccount>>>,
}

impl MemoryProviderAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ProviderAccount>>, RegistryError> {
        self.accounts
            .lock()
            .map_err(|_| RegistryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

/// At most one row per `(user_id, provider)`.
fn check_unique(accounts: &[ProviderAccount]) -> Result<(), RegistryError> {
    for (i, a) in accounts.iter().enumerate() {
        if accounts[i + 1..]
            .iter()
            .any(|b| a.user_id == b.user_id && a.provider == b.provider)
        {
            return Err(RegistryError::DuplicateLink {
                user_id: a.user_id,
                provider: a.provider,
            });
        }
    }
    Ok(())
}

/// Same order as the Postgres store: `created_at`, then `id`.
fn creation_order(a: &ProviderAccount, b: &ProviderAccount) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

fn assert_unique(accounts: &[ProviderAccount]) {
    let checked = check_unique(accounts);
    debug_assert!(checked.is_ok(), "{:?}", checked);
}

#[async_trait]
impl ProviderAccountStore for MemoryProviderAccountStore {
    async fn upsert(&self, link: NewLink) -> Result<ProviderAccount, RegistryError> {
        let mut accounts = self.lock()?;
        let now = Utc::now();

        let existing = accounts
            .iter_mut()
            .find(|a| a.user_id == link.user_id && a.provider == link.provider);

        let account = match existing {
            Some(account) => {
                account.access_token = link.access_token;
                account.scopes = link.scopes;
                account.updated_at = now;
                account.clone()
            }
            None => {
                let account = ProviderAccount {
                    id: Uuid::new_v4(),
                    user_id: link.user_id,
                    provider: link.provider,
                    access_token: link.access_token,
                    scopes: link.scopes,
                    created_at: now,
                    updated_at: now,
                };
                accounts.push(account.clone());
                account
            }
        };

        assert_unique(&accounts);
        Ok(account)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ProviderAccount>, RegistryError> {
        let accounts = self.lock()?;
        let mut owned: Vec<ProviderAccount> = accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(creation_order);
        Ok(owned)
    }

    async fn delete(&self, account_id: Uuid, owner: Option<Uuid>) -> Result<bool, RegistryError> {
        let mut accounts = self.lock()?;
        let before = accounts.len();
        accounts.retain(|a| !(a.id == account_id && owner.map_or(true, |o| o == a.user_id)));
        assert_unique(&accounts);
        Ok(accounts.len() != before)
    }

    async fn update_scopes(
        &self,
        account_id: Uuid,
        scopes: Vec<String>,
    ) -> Result<Option<ProviderAccount>, RegistryError> {
        let mut accounts = self.lock()?;
        let updated = accounts.iter_mut().find(|a| a.id == account_id).map(|account| {
            account.scopes = scopes;
            account.updated_at = Utc::now();
            account.clone()
        });
        assert_unique(&accounts);
        Ok(updated)
    }
}
