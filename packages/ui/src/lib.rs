//! Client side of the dashboard's social connections page.
//!
//! [`ConnectionController`] drives connect/disconnect against the server's
//! JSON API through an [`AccountsApi`] and hands OAuth redirects to a
//! [`Navigator`]. Rendering is left to the embedding frontend, which reads
//! [`ConnectionController::roster`].

mod api_client;
mod connections;
mod navigator;

pub use api_client::{AccountsApi, ClientError, HttpAccountsApi};
pub use connections::{
    ConnectionController, Dispatch, FlowError, MutationKind, MutationOutcome, MutationState,
    ProviderView,
};
pub use navigator::Navigator;
