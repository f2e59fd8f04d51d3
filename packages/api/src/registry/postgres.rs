//! Postgres-backed provider account store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewLink, ProviderAccountStore, RegistryError};
use crate::models::ProviderAccount;

/// Provider accounts in the `provider_accounts` table.
#[derive(Debug, Clone)]
pub struct PgProviderAccountStore {
    pool: PgPool,
}

impl PgProviderAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderAccountStore for PgProviderAccountStore {
    async fn upsert(&self, link: NewLink) -> Result<ProviderAccount, RegistryError> {
        let account: ProviderAccount = sqlx::query_as(
            r#"
            INSERT INTO provider_accounts (user_id, provider, access_token, scopes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, provider)
            DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scopes = EXCLUDED.scopes,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(link.user_id)
        .bind(link.provider.as_str())
        .bind(&link.access_token)
        .bind(&link.scopes)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ProviderAccount>, RegistryError> {
        let accounts: Vec<ProviderAccount> = sqlx::query_as(
            "SELECT * FROM provider_accounts WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn delete(&self, account_id: Uuid, owner: Option<Uuid>) -> Result<bool, RegistryError> {
        let result = sqlx::query(
            "DELETE FROM provider_accounts WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
        )
        .bind(account_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_scopes(
        &self,
        account_id: Uuid,
        scopes: Vec<String>,
    ) -> Result<Option<ProviderAccount>, RegistryError> {
        let account: Option<ProviderAccount> = sqlx::query_as(
            r#"
            UPDATE provider_accounts
            SET scopes = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(&scopes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}
