//! # Connection flow controller
//!
//! Keeps the connected-account list for the signed-in user and crosses it with
//! the fixed provider roster. Each provider carries its own mutation state:
//!
//! ```text
//! Idle ──► Pending(kind) ──► Settled(kind, outcome)
//!               ▲                    │
//!               └────────────────────┘
//! ```
//!
//! A connect or disconnect for a provider whose state is `Pending` is
//! suppressed instead of fired again, so the server never sees two racing
//! upserts or deletes for the same provider from this client.
//!
//! A connect leaves the page: the controller only asks the server for the
//! authorization URL and hands it to the [`Navigator`]. When the browser comes
//! back, the frontend calls [`ConnectionController::resume`], which refetches
//! the list and settles every pending connect from what the server reports.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use api::models::AuthorizeRequest;
use api::providers::PROVIDERS;
use api::{ProviderAccountInfo, ProviderKey};
use thiserror::Error;

use crate::api_client::{AccountsApi, ClientError};
use crate::navigator::Navigator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationState {
    #[default]
    Idle,
    Pending(MutationKind),
    Settled(MutationKind, MutationOutcome),
}

impl MutationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending(_))
    }
}

/// Whether a requested mutation was actually started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started,
    /// Another mutation for the same provider is in flight.
    Suppressed,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ClientError),
}

/// One roster row as the frontend renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderView {
    pub provider: ProviderKey,
    pub name: &'static str,
    pub description: &'static str,
    pub connected: Option<ProviderAccountInfo>,
    pub mutation: MutationState,
}

impl ProviderView {
    pub fn is_connected(&self) -> bool {
        self.connected.is_some()
    }
}

#[derive(Default)]
struct FlowState {
    accounts: Vec<ProviderAccountInfo>,
    mutations: HashMap<ProviderKey, MutationState>,
}

pub struct ConnectionController<A, N> {
    api: A,
    navigator: N,
    state: Mutex<FlowState>,
}

impl<A: AccountsApi, N: Navigator> ConnectionController<A, N> {
    pub fn new(api: A, navigator: N) -> Self {
        Self {
            api,
            navigator,
            state: Mutex::new(FlowState::default()),
        }
    }

    // The guard is never held across an await.
    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refetch the connected accounts, replacing the cached list.
    pub async fn refresh(&self) -> Result<(), FlowError> {
        let accounts = self.api.list_accounts().await?;
        self.state().accounts = accounts;
        Ok(())
    }

    pub fn accounts(&self) -> Vec<ProviderAccountInfo> {
        self.state().accounts.clone()
    }

    pub fn mutation(&self, provider: ProviderKey) -> MutationState {
        self.state()
            .mutations
            .get(&provider)
            .cloned()
            .unwrap_or_default()
    }

    /// Every supported provider with its connection and mutation state.
    pub fn roster(&self) -> Vec<ProviderView> {
        let state = self.state();
        PROVIDERS
            .iter()
            .map(|spec| ProviderView {
                provider: spec.key,
                name: spec.name,
                description: spec.description,
                connected: state
                    .accounts
                    .iter()
                    .find(|a| a.provider == spec.key)
                    .cloned(),
                mutation: state.mutations.get(&spec.key).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Start connecting `provider`; the browser comes back to `next`.
    pub async fn connect(&self, provider: ProviderKey, next: &str) -> Result<Dispatch, FlowError> {
        if !self.begin(provider, MutationKind::Connect) {
            tracing::debug!(%provider, "Connect suppressed, mutation in flight");
            return Ok(Dispatch::Suppressed);
        }

        let request = AuthorizeRequest {
            provider,
            next: Some(next.to_string()),
        };

        match self.api.authorize(&request).await {
            Ok(response) => {
                tracing::info!(%provider, "Redirecting to identity provider");
                self.navigator.navigate(&response.url);
                Ok(Dispatch::Started)
            }
            Err(e) => {
                self.settle(
                    provider,
                    MutationKind::Connect,
                    MutationOutcome::Failed(e.to_string()),
                );
                Err(e.into())
            }
        }
    }

    /// Called when navigation returns from an OAuth round trip.
    pub async fn resume(&self) -> Result<(), FlowError> {
        let refreshed = self.refresh().await;

        let mut state = self.state();
        let FlowState {
            accounts,
            mutations,
        } = &mut *state;

        for (provider, mutation) in mutations.iter_mut() {
            if *mutation != MutationState::Pending(MutationKind::Connect) {
                continue;
            }
            let outcome = match &refreshed {
                Ok(()) if accounts.iter().any(|a| a.provider == *provider) => {
                    MutationOutcome::Succeeded
                }
                Ok(()) => MutationOutcome::Failed("provider not connected".to_string()),
                Err(e) => MutationOutcome::Failed(e.to_string()),
            };
            *mutation = MutationState::Settled(MutationKind::Connect, outcome);
        }

        refreshed
    }

    /// Disconnect `account`. On success it leaves the cached list at once and
    /// the list is refetched.
    pub async fn disconnect(&self, account: &ProviderAccountInfo) -> Result<Dispatch, FlowError> {
        let provider = account.provider;
        if !self.begin(provider, MutationKind::Disconnect) {
            tracing::debug!(%provider, "Disconnect suppressed, mutation in flight");
            return Ok(Dispatch::Suppressed);
        }

        if let Err(e) = self.api.unlink(&account.id).await {
            tracing::warn!(%provider, "Disconnect failed: {}", e);
            self.settle(
                provider,
                MutationKind::Disconnect,
                MutationOutcome::Failed(e.to_string()),
            );
            return Err(e.into());
        }

        self.state().accounts.retain(|a| a.id != account.id);
        self.settle(provider, MutationKind::Disconnect, MutationOutcome::Succeeded);
        self.refresh().await?;
        Ok(Dispatch::Started)
    }

    /// Move `provider` to `Pending(kind)` unless it already is pending.
    fn begin(&self, provider: ProviderKey, kind: MutationKind) -> bool {
        let mut state = self.state();
        let mutation = state.mutations.entry(provider).or_default();
        if mutation.is_pending() {
            return false;
        }
        *mutation = MutationState::Pending(kind);
        true
    }

    fn settle(&self, provider: ProviderKey, kind: MutationKind, outcome: MutationOutcome) {
        self.state()
            .mutations
            .insert(provider, MutationState::Settled(kind, outcome));
    }
}
