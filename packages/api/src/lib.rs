//! # API crate — account linking and sessions for the marketing dashboard
//!
//! This crate holds everything the dashboard's server needs to sign users in
//! through a hosted auth service and to remember which social accounts each
//! user has connected. Client-safe types compile without features so that the
//! `ui` crate can share them; everything that touches the network, the database,
//! or the session store is gated behind the `server` feature.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`providers`] | — | Closed provider roster, scope resolution, OAuth provider mapping |
//! | [`models`] | — | Request/response bodies and client-safe projections (`UserInfo`, `ProviderAccountInfo`) |
//! | [`auth`] | `server` | Hosted auth service client, PKCE flows, cookie-backed session store |
//! | [`callback`] | `server` | `/auth/callback` resolution into sign-in and link outcomes |
//! | [`registry`] | `server` | Durable `(user, provider)` → provider account mapping |
//! | [`db`] | `server` | PostgreSQL connection pool (lazy `OnceCell` singleton) and migrations |
//! | [`error`] | `server` | JSON error responses |
//! | [`routes`] | `server` | Axum router for the auth and accounts endpoints |

pub mod auth;
#[cfg(feature = "server")]
pub mod callback;
#[cfg(feature = "server")]
pub mod db;
#[cfg(feature = "server")]
pub mod error;
pub mod models;
pub mod providers;
#[cfg(feature = "server")]
pub mod registry;
#[cfg(feature = "server")]
pub mod routes;

#[cfg(all(test, feature = "server"))]
mod testing;

pub use models::{ProviderAccountInfo, ProviderInfo, UserInfo};
pub use providers::{scopes_for, ProviderKey};

#[cfg(feature = "server")]
pub use routes::{router, AppState};
